/// Linearly resample mono samples from `src_rate` to `dst_rate`.
///
/// Output sample `i` is read at source position `i * src_rate / dst_rate`, so
/// the time axis is preserved exactly; the last few outputs hold the final
/// source sample instead of extrapolating.
pub fn resample_linear(samples: &[f32], src_rate: u32, dst_rate: u32) -> Vec<f32> {
    if samples.is_empty() || src_rate == 0 || dst_rate == 0 {
        return Vec::new();
    }
    if src_rate == dst_rate || samples.len() == 1 {
        return samples.to_vec();
    }
    let ratio = src_rate as f64 / dst_rate as f64;
    let target_len = ((samples.len() as f64) / ratio).round().max(1.0) as usize;
    let last = samples.len() - 1;
    (0..target_len)
        .map(|i| {
            let pos = i as f64 * ratio;
            let idx = (pos.floor() as usize).min(last);
            let next = (idx + 1).min(last);
            let frac = (pos - idx as f64).clamp(0.0, 1.0) as f32;
            let s0 = samples[idx];
            s0 + (samples[next] - s0) * frac
        })
        .collect()
}
