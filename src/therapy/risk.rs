/// Band a predicted HbA1c-scale risk score into a clinical label.
pub fn risk_label(score: f64) -> &'static str {
    if score < 5.7 {
        "Normal"
    } else if score < 6.5 {
        "At Risk"
    } else if score < 7.1 {
        "Moderate Risk"
    } else if score < 8.1 {
        "Risky"
    } else if score <= 9.0 {
        "Very Risky"
    } else {
        "Critical"
    }
}
