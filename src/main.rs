#[tokio::main]
async fn main() {
    if let Err(e) = diacare_lib::run().await {
        eprintln!("diacare: {e}");
        std::process::exit(1);
    }
}
