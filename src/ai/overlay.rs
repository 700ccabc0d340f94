//! One-click damage overlay: asks Gemini for a FeatureCollection of damage
//! points around the Noto Peninsula and draws them as red circles.
//!
//! The generated data always lives in the `generated-geojson` source and the
//! `generated-geojson-points` layer. The first successful run creates both;
//! later runs replace the source data in place, so the layer keeps its
//! position in the paint order.

use crate::ai::client::{GeminiClient, GeminiConfig};
use crate::core::map::MapView;
use crate::data::geojson::GeoJson;
use crate::runtime::{self, AsyncHandleWithResult};
use crate::style::paint::{CirclePaint, Color, ZoomInterpolation};
use crate::style::LayerDef;

pub const GENERATED_SOURCE_ID: &str = "generated-geojson";
pub const GENERATED_LAYER_ID: &str = "generated-geojson-points";

/// Shown to the user whenever generation fails, whatever the cause
pub const GENERATION_FAILED_MESSAGE: &str = "GeoJSONの生成に失敗しました";

/// The fixed prompt sent to Gemini. Coordinates are constrained to the
/// Noto Peninsula and the output to a FeatureCollection of 20 points.
pub const GENERATION_PROMPT: &str = r#"以下の制約に従ってGeoJSONを生成してください：
1. FeatureCollectionとして生成
2. 能登半島周辺(緯度: 37.2-37.5, 経度: 136.9-137.2)の座標を使用
3. Pointのみで表現
4. 20個のPointを含む
5. 20個のポイントは規則的に並ばずにランダムに散らしてください
返答は必ずJSONのみにしてください。

対象エリア: 能登半島の被害状況
含めるべき情報: 建物被害、道路寸断、地滑り

sampleJSON:
"""
{
  "type": "FeatureCollection",
  "name": "17",
  "features": [
    {
      "type": "Feature",
      "geometry": {
        "type": "Point",
        "coordinates": [ 136.6481028, 36.55282538 ]
      }
    }
  ]
}
"""
"#;

/// Response schema handed to Gemini so the reply parses as GeoJSON
fn response_schema() -> serde_json::Value {
    serde_json::json!({
        "type": "OBJECT",
        "properties": {
            "type": {
                "type": "STRING",
                "description": "Must be 'FeatureCollection'"
            },
            "name": {
                "type": "STRING"
            },
            "features": {
                "type": "ARRAY",
                "items": {
                    "type": "OBJECT",
                    "properties": {
                        "type": {
                            "type": "STRING",
                            "description": "Must be 'Feature'"
                        },
                        "geometry": {
                            "type": "OBJECT",
                            "properties": {
                                "type": {
                                    "type": "STRING",
                                    "enum": ["Point", "LineString", "Polygon"]
                                },
                                "coordinates": {
                                    "type": "ARRAY",
                                    "items": { "type": "NUMBER" }
                                }
                            },
                            "required": ["type", "coordinates"]
                        }
                    },
                    "required": ["type", "geometry"]
                }
            }
        },
        "required": ["type", "features"]
    })
}

/// Drives overlay generation without blocking the UI.
///
/// [`generate`](Self::generate) starts a request on the async runtime and
/// is a no-op while one is in flight; [`poll`](Self::poll) reaps the result
/// each frame and applies it to the map.
pub struct OverlayGenerator {
    config: Option<GeminiConfig>,
    inflight: Option<Box<dyn AsyncHandleWithResult>>,
    error: Option<String>,
    requests_started: u64,
}

impl OverlayGenerator {
    /// A generator that reads `GEMINI_API_KEY` when a request starts
    pub fn new() -> Self {
        Self {
            config: None,
            inflight: None,
            error: None,
            requests_started: 0,
        }
    }

    /// A generator with an explicit key and model
    pub fn with_config(config: GeminiConfig) -> Self {
        Self {
            config: Some(config),
            ..Self::new()
        }
    }

    /// Whether a request is in flight and not yet applied
    pub fn is_busy(&self) -> bool {
        self.inflight.is_some()
    }

    /// The last failure message, cleared when a new request starts
    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn requests_started(&self) -> u64 {
        self.requests_started
    }

    /// Starts a generation request. Does nothing while one is in flight.
    ///
    /// Must be called from within the async runtime.
    pub fn generate(&mut self) {
        if self.inflight.is_some() {
            return;
        }

        self.error = None;
        self.requests_started += 1;

        let config = self.config.clone();
        self.inflight = Some(runtime::spawn_with_result(request_document(config)));
    }

    /// Applies a finished request to the map, if one is ready.
    ///
    /// On success the generated source and layer are created or refreshed;
    /// on failure the error is logged and [`error`](Self::error) is set to
    /// [`GENERATION_FAILED_MESSAGE`]. Returns true when the request settled
    /// this call.
    pub fn poll(&mut self, map: &mut MapView) -> bool {
        let Some(handle) = self.inflight.as_mut() else {
            return false;
        };
        let Some(boxed) = handle.try_result() else {
            return false;
        };
        self.inflight = None;

        let outcome = boxed
            .downcast::<crate::Result<GeoJson>>()
            .map(|result| *result)
            .unwrap_or_else(|_| {
                Err(crate::Error::Generation(
                    "generation task produced an unexpected result".to_string(),
                ))
            });

        match outcome.and_then(|document| apply_document(map, document)) {
            Ok(()) => {}
            Err(e) => {
                log::error!("Error: {}", e);
                self.error = Some(GENERATION_FAILED_MESSAGE.to_string());
            }
        }

        true
    }
}

impl Default for OverlayGenerator {
    fn default() -> Self {
        Self::new()
    }
}

async fn request_document(config: Option<GeminiConfig>) -> crate::Result<GeoJson> {
    let config = match config {
        Some(config) => config,
        None => GeminiConfig::from_env()?,
    };

    let client = GeminiClient::new(config);
    let text = client
        .generate_json(GENERATION_PROMPT, response_schema())
        .await?;
    parse_document(&text)
}

/// Parses Gemini's reply and requires a FeatureCollection
fn parse_document(text: &str) -> crate::Result<GeoJson> {
    let document = GeoJson::from_str(text)?;
    if matches!(document, GeoJson::FeatureCollection { .. }) {
        Ok(document)
    } else {
        Err(crate::Error::ParseError(
            "generated document is not a FeatureCollection".to_string(),
        ))
    }
}

/// Puts a generated document on the map.
///
/// Creates the reserved source and circle layer on first use; afterwards
/// only the source data changes.
pub fn apply_document(map: &mut MapView, document: GeoJson) -> crate::Result<()> {
    if map.has_source(GENERATED_SOURCE_ID) {
        return map.set_geojson(GENERATED_SOURCE_ID, document);
    }

    map.add_source(GENERATED_SOURCE_ID, document)?;
    map.add_layer(LayerDef::circle(
        GENERATED_LAYER_ID,
        GENERATED_SOURCE_ID,
        CirclePaint {
            color: Color::parse("red")?,
            radius: ZoomInterpolation::linear(vec![(5.0, 1.0), (12.0, 8.0)])?.into(),
            opacity: ZoomInterpolation::linear(vec![(5.0, 0.8), (12.0, 0.8)])?.into(),
        },
    ))
}
