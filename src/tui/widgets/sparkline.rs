/// Unicode block characters used for sparkline rendering, lowest to highest.
const BLOCKS: [char; 8] = [
    '\u{2581}', '\u{2582}', '\u{2583}', '\u{2584}', '\u{2585}', '\u{2586}', '\u{2587}', '\u{2588}',
];

/// Renders a sequence of data points as a Unicode sparkline string of
/// exactly `width` characters, left-padded with spaces when `data` is
/// shorter, truncated to the newest `width` points when longer.
///
/// `scale_max` pins the top of the scale; pass the shared maximum of the
/// upload and download series so both charts are comparable. `None` scales
/// to the visible maximum.
pub fn sparkline_string(data: &[u64], width: usize, scale_max: Option<u64>) -> String {
    if width == 0 {
        return String::new();
    }

    let visible: &[u64] = if data.len() > width {
        &data[data.len() - width..]
    } else {
        data
    };

    let max_val = match scale_max {
        Some(m) => m,
        None => visible.iter().copied().max().unwrap_or(0),
    };

    let mut result = String::with_capacity(width * 4);

    let padding = width.saturating_sub(visible.len());
    for _ in 0..padding {
        result.push(' ');
    }

    for &val in visible {
        if max_val == 0 {
            result.push(BLOCKS[0]);
        } else {
            let idx = ((val as f64 / max_val as f64) * 7.0).round() as usize;
            result.push(BLOCKS[idx.min(7)]);
        }
    }

    result
}
