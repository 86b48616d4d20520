use std::any::Any;

/// Extracts a human-readable message from a panic payload.
///
/// Handles the `&'static str` and `String` payloads produced by `panic!`;
/// anything else is reported as `<non-string panic payload>`.
pub fn panic_message(payload: &(dyn Any + Send)) -> String {
	if let Some(msg) = payload.downcast_ref::<&'static str>() {
		(*msg).to_string()
	} else if let Some(msg) = payload.downcast_ref::<String>() {
		msg.clone()
	} else {
		"<non-string panic payload>".to_string()
	}
}
