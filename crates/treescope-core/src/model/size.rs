/// Human-readable formatting for byte counts, item counts, and scan rates.
///
/// Sizes stay `u64` bytes everywhere; floating point only appears here at
/// the display boundary. Treemap labels go through [`format_size`] with the
/// item's true size, never its layout weight.

const UNITS: [&str; 5] = ["B", "KB", "MB", "GB", "TB"];

/// Format a byte count with binary (1024) steps and short unit labels.
pub fn format_size(bytes: u64) -> String {
    if bytes < 1024 {
        return format!("{bytes} B");
    }
    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    // GB and above get one more digit: the numbers there are what users compare.
    if unit >= 3 {
        format!("{value:.2} {}", UNITS[unit])
    } else {
        format!("{value:.1} {}", UNITS[unit])
    }
}

/// Format a count with comma thousand separators.
pub fn format_count(count: u64) -> String {
    let digits = count.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out
}

/// Format a traversal throughput, e.g. `"12,345 items/s"`.
pub fn format_rate(items_per_second: f64) -> String {
    let whole = if items_per_second.is_finite() && items_per_second > 0.0 {
        items_per_second.round() as u64
    } else {
        0
    };
    format!("{} items/s", format_count(whole))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bytes_below_one_kilobyte() {
        assert_eq!(format_size(0), "0 B");
        assert_eq!(format_size(1023), "1023 B");
    }

    #[test]
    fn scaled_units() {
        assert_eq!(format_size(1536), "1.5 KB");
        assert_eq!(format_size(1_048_576), "1.0 MB");
        assert_eq!(format_size(1_073_741_824), "1.00 GB");
        assert_eq!(format_size(1_099_511_627_776), "1.00 TB");
    }

    #[test]
    fn counts_get_separators() {
        assert_eq!(format_count(0), "0");
        assert_eq!(format_count(999), "999");
        assert_eq!(format_count(1_000), "1,000");
        assert_eq!(format_count(1_234_567), "1,234,567");
    }

    #[test]
    fn rate_rounds_and_clamps() {
        assert_eq!(format_rate(1234.4), "1,234 items/s");
        assert_eq!(format_rate(f64::NAN), "0 items/s");
    }
}
