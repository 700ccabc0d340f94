use serde::{Deserialize, Serialize};

/// An RGB color parsed from a hex string or a small set of named colors
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Color {
    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// Parses `#rgb`, `#rrggbb` or a named color
    pub fn parse(value: &str) -> crate::Result<Self> {
        let trimmed = value.trim();

        if let Some(hex) = trimmed.strip_prefix('#') {
            return match hex.len() {
                3 => {
                    let r = hex_component(&hex[0..1])?;
                    let g = hex_component(&hex[1..2])?;
                    let b = hex_component(&hex[2..3])?;
                    Ok(Self::rgb(r * 17, g * 17, b * 17))
                }
                6 => Ok(Self::rgb(
                    hex_component(&hex[0..2])?,
                    hex_component(&hex[2..4])?,
                    hex_component(&hex[4..6])?,
                )),
                _ => Err(crate::Error::Style(format!(
                    "invalid hex color '{}'",
                    value
                ))),
            };
        }

        match trimmed.to_ascii_lowercase().as_str() {
            "red" => Ok(Self::rgb(255, 0, 0)),
            "green" => Ok(Self::rgb(0, 128, 0)),
            "blue" => Ok(Self::rgb(0, 0, 255)),
            "white" => Ok(Self::rgb(255, 255, 255)),
            "black" => Ok(Self::rgb(0, 0, 0)),
            "yellow" => Ok(Self::rgb(255, 255, 0)),
            "orange" => Ok(Self::rgb(255, 165, 0)),
            _ => Err(crate::Error::Style(format!(
                "unrecognized color '{}'",
                value
            ))),
        }
    }
}

fn hex_component(digits: &str) -> crate::Result<u8> {
    u8::from_str_radix(digits, 16)
        .map_err(|_| crate::Error::Style(format!("invalid hex color component '{}'", digits)))
}

/// Piecewise-linear interpolation over zoom, clamped at the outer stops
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ZoomInterpolation {
    stops: Vec<(f64, f64)>,
}

impl ZoomInterpolation {
    /// Builds an interpolation from `(zoom, value)` stops.
    ///
    /// Stops must be non-empty, finite and strictly increasing in zoom.
    pub fn linear(stops: Vec<(f64, f64)>) -> crate::Result<Self> {
        if stops.is_empty() {
            return Err(crate::Error::Style(
                "zoom interpolation needs at least one stop".to_string(),
            ));
        }
        for (zoom, value) in &stops {
            if !zoom.is_finite() || !value.is_finite() {
                return Err(crate::Error::Style(
                    "zoom interpolation stops must be finite".to_string(),
                ));
            }
        }
        for pair in stops.windows(2) {
            if pair[1].0 <= pair[0].0 {
                return Err(crate::Error::Style(format!(
                    "zoom interpolation stops must be strictly increasing, got {} after {}",
                    pair[1].0, pair[0].0
                )));
            }
        }
        Ok(Self { stops })
    }

    /// Evaluates the interpolation at the given zoom
    pub fn eval(&self, zoom: f64) -> f64 {
        let first = self.stops[0];
        if zoom <= first.0 {
            return first.1;
        }

        let last = self.stops[self.stops.len() - 1];
        if zoom >= last.0 {
            return last.1;
        }

        for pair in self.stops.windows(2) {
            let (z0, v0) = pair[0];
            let (z1, v1) = pair[1];
            if zoom >= z0 && zoom <= z1 {
                let t = (zoom - z0) / (z1 - z0);
                return v0 + (v1 - v0) * t;
            }
        }

        last.1
    }

    pub fn stops(&self) -> &[(f64, f64)] {
        &self.stops
    }
}

/// A paint scalar that is either constant or interpolated over zoom
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PaintValue {
    Constant(f64),
    Interpolated(ZoomInterpolation),
}

impl PaintValue {
    pub fn eval(&self, zoom: f64) -> f64 {
        match self {
            PaintValue::Constant(value) => *value,
            PaintValue::Interpolated(interp) => interp.eval(zoom),
        }
    }
}

impl From<f64> for PaintValue {
    fn from(value: f64) -> Self {
        PaintValue::Constant(value)
    }
}

impl From<ZoomInterpolation> for PaintValue {
    fn from(interp: ZoomInterpolation) -> Self {
        PaintValue::Interpolated(interp)
    }
}

/// Paint properties for raster layers
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RasterPaint {
    pub opacity: f64,
}

impl Default for RasterPaint {
    fn default() -> Self {
        Self { opacity: 1.0 }
    }
}

/// Paint properties for fill layers
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FillPaint {
    pub color: Color,
    pub opacity: PaintValue,
}

impl Default for FillPaint {
    fn default() -> Self {
        Self {
            color: Color::rgb(0x33, 0x88, 0xff),
            opacity: PaintValue::Constant(0.2),
        }
    }
}

/// Paint properties for line layers
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LinePaint {
    pub color: Color,
    pub opacity: PaintValue,
    pub width: f64,
}

impl Default for LinePaint {
    fn default() -> Self {
        Self {
            color: Color::rgb(0x33, 0x88, 0xff),
            opacity: PaintValue::Constant(1.0),
            width: 3.0,
        }
    }
}

/// Paint properties for circle layers
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CirclePaint {
    pub color: Color,
    pub radius: PaintValue,
    pub opacity: PaintValue,
}

impl Default for CirclePaint {
    fn default() -> Self {
        Self {
            color: Color::rgb(0x33, 0x88, 0xff),
            radius: PaintValue::Constant(5.0),
            opacity: PaintValue::Constant(1.0),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_color_parse_hex() {
        assert_eq!(Color::parse("#ffd700").unwrap(), Color::rgb(255, 215, 0));
        assert_eq!(Color::parse("#fff").unwrap(), Color::rgb(255, 255, 255));
        assert_eq!(Color::parse("#ff6347").unwrap(), Color::rgb(255, 99, 71));
    }

    #[test]
    fn test_color_parse_named() {
        assert_eq!(Color::parse("red").unwrap(), Color::rgb(255, 0, 0));
        assert_eq!(Color::parse("WHITE").unwrap(), Color::rgb(255, 255, 255));
    }

    #[test]
    fn test_color_parse_invalid() {
        assert!(Color::parse("#ffd7").is_err());
        assert!(Color::parse("#zzzzzz").is_err());
        assert!(Color::parse("cerulean").is_err());
    }

    #[test]
    fn test_interpolation_eval() {
        let interp = ZoomInterpolation::linear(vec![(5.0, 1.0), (12.0, 8.0)]).unwrap();

        assert_eq!(interp.eval(4.0), 1.0);
        assert_eq!(interp.eval(5.0), 1.0);
        assert_eq!(interp.eval(12.0), 8.0);
        assert_eq!(interp.eval(14.0), 8.0);

        let mid = interp.eval(8.5);
        assert!((mid - 4.5).abs() < 1e-9);
    }

    #[test]
    fn test_interpolation_rejects_unordered_stops() {
        assert!(ZoomInterpolation::linear(vec![(12.0, 8.0), (5.0, 1.0)]).is_err());
        assert!(ZoomInterpolation::linear(vec![]).is_err());
        assert!(ZoomInterpolation::linear(vec![(5.0, f64::NAN)]).is_err());
    }

    #[test]
    fn test_paint_value_serde_untagged() {
        let constant: PaintValue = serde_json::from_value(serde_json::json!(0.8)).unwrap();
        assert_eq!(constant, PaintValue::Constant(0.8));

        let interpolated: PaintValue =
            serde_json::from_value(serde_json::json!({ "stops": [[5.0, 0.05], [12.0, 0.8]] }))
                .unwrap();
        assert!((interpolated.eval(12.0) - 0.8).abs() < 1e-9);
    }
}
