/// Numerically stable `ln(softmax(logits))` over one row of logits.
pub fn log_softmax(logits: &[f64]) -> Vec<f64> {
    let max = logits.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let log_sum = logits.iter().map(|&x| (x - max).exp()).sum::<f64>().ln() + max;
    logits.iter().map(|&x| x - log_sum).collect()
}
