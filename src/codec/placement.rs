use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use ts_rs::TS;

/// Palette attached to every DMX placement. The DMX effect ignores colors,
/// but the device format requires one.
pub const DEFAULT_PALETTE: &str = "C_BUTTON_Palette1=#FFFFFF,C_CHECKBOX_Palette1=1";

/// One effect on one element of the show file, ready for an external writer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct EffectPlacement {
    /// Element (model) name; the fixture id.
    pub element: String,
    pub layer: u32,
    pub start_ms: f64,
    pub end_ms: f64,
    /// `E_SLIDER_DMX<n>` / `E_VALUECURVE_DMX<n>` keys to their values.
    pub settings: BTreeMap<String, String>,
    pub palette: String,
}

impl EffectPlacement {
    pub fn new(element: &str, layer: u32, start_ms: f64, end_ms: f64) -> Self {
        Self {
            element: element.to_string(),
            layer,
            start_ms: start_ms.round(),
            end_ms: end_ms.round(),
            settings: BTreeMap::new(),
            palette: DEFAULT_PALETTE.to_string(),
        }
    }

    /// Settings joined the way the device stores them: `key=value,key=value`.
    pub fn settings_string(&self) -> String {
        self.settings
            .iter()
            .map(|(k, v)| format!("{k}={v}"))
            .collect::<Vec<_>>()
            .join(",")
    }
}

pub fn slider_key(dmx: u16) -> String {
    format!("E_SLIDER_DMX{dmx}")
}

pub fn value_curve_key(dmx: u16) -> String {
    format!("E_VALUECURVE_DMX{dmx}")
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::indexing_slicing)]
mod tests {
    use super::*;

    #[test]
    fn settings_join_in_key_order() {
        let mut p = EffectPlacement::new("mh1", 0, 1000.4, 2000.6);
        p.settings.insert(slider_key(2), "128".into());
        p.settings.insert(slider_key(1), "0".into());
        assert_eq!(p.settings_string(), "E_SLIDER_DMX1=0,E_SLIDER_DMX2=128");
        assert_eq!(p.start_ms, 1000.0);
        assert_eq!(p.end_ms, 2001.0);
    }
}
