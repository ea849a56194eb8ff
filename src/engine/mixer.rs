use crate::model::BlendMode;

/// Blend a foreground device value onto a background one. Results of `Add`
/// may exceed 255; the boundary enforcer clamps them.
pub fn blend(bg: f64, fg: f64, mode: BlendMode) -> f64 {
    match mode {
        BlendMode::Override => fg,
        BlendMode::Add => bg + fg,
        BlendMode::Max => bg.max(fg),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::indexing_slicing)]
mod tests {
    use super::*;

    #[test]
    fn modes() {
        assert_eq!(blend(100.0, 50.0, BlendMode::Override), 50.0);
        assert_eq!(blend(100.0, 50.0, BlendMode::Max), 100.0);
        assert_eq!(blend(200.0, 100.0, BlendMode::Add), 300.0);
    }
}
