//! Frame blob encoding.
//!
//! A saved frame is a small JSON envelope around the frame snapshot:
//!
//! ```json
//! { "version": 1, "frame": { ... } }
//! ```

use formnav_core::error::{NavigationError, Result};
use formnav_core::frame::{FrameFactory, FrameSnapshot, SessionFrame};
use formnav_core::session::SessionSerializer;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Envelope version written by [`JsonSessionSerializer`].
pub const FRAME_ENVELOPE_VERSION: u32 = 1;

#[derive(Debug, Serialize, Deserialize)]
struct FrameEnvelope {
    version: u32,
    frame: FrameSnapshot,
}

/// Encodes frames as versioned JSON and rebuilds them through a [`FrameFactory`].
#[derive(Clone)]
pub struct JsonSessionSerializer {
    frames: Arc<dyn FrameFactory>,
}

impl JsonSessionSerializer {
    pub fn new(frames: Arc<dyn FrameFactory>) -> Self {
        Self { frames }
    }
}

impl SessionSerializer for JsonSessionSerializer {
    fn serialize(&self, frame: &dyn SessionFrame) -> Result<Vec<u8>> {
        let envelope = FrameEnvelope {
            version: FRAME_ENVELOPE_VERSION,
            frame: frame.snapshot(),
        };
        Ok(serde_json::to_vec(&envelope)?)
    }

    fn restore(&self, bytes: &[u8]) -> Result<Box<dyn SessionFrame>> {
        let envelope: FrameEnvelope = serde_json::from_slice(bytes)?;
        if envelope.version != FRAME_ENVELOPE_VERSION {
            return Err(NavigationError::serialization(
                "JSON",
                format!("unsupported frame envelope version {}", envelope.version),
            ));
        }
        self.frames.restore(envelope.frame)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use formnav_core::testing::{FakeFrameFactory, Step};

    fn serializer(steps: Vec<Step>) -> (JsonSessionSerializer, Arc<FakeFrameFactory>) {
        let factory = Arc::new(FakeFrameFactory::new(steps));
        (JsonSessionSerializer::new(factory.clone()), factory)
    }

    #[test]
    fn test_restored_frame_keeps_position() {
        let (serializer, factory) =
            serializer(vec![Step::command("root"), Step::sync(), Step::done()]);
        let mut frame = factory.fresh();
        frame.set_command("m0".to_string());

        let bytes = serializer.serialize(frame.as_ref()).unwrap();
        let restored = serializer.restore(&bytes).unwrap();

        assert_eq!(restored.snapshot(), frame.snapshot());
        assert_eq!(restored.current_command(), frame.current_command());
    }

    #[test]
    fn test_envelope_carries_version() {
        let (serializer, factory) = serializer(vec![Step::done()]);
        let bytes = serializer.serialize(factory.fresh().as_ref()).unwrap();
        let value: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(value["version"], 1);
        assert!(value.get("frame").is_some());
    }

    #[test]
    fn test_rejects_unknown_version() {
        let (serializer, _) = serializer(vec![Step::done()]);
        let err = serializer
            .restore(br#"{"version":9,"frame":{}}"#)
            .err()
            .unwrap();
        assert!(matches!(err, NavigationError::Serialization { .. }));
    }

    #[test]
    fn test_rejects_garbage() {
        let (serializer, _) = serializer(vec![Step::done()]);
        assert!(serializer.restore(b"not json").is_err());
    }
}
