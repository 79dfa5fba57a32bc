use thiserror::Error;

/// The error type of the hala-meshlet crate.
#[derive(Error, Debug)]
pub struct HalaMeshletError {
  msg: String,
  #[source]
  source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

/// The implementation of the error type of the hala-meshlet crate.
impl HalaMeshletError {
  /// Create a new error.
  /// param msg: The message of the error.
  /// param source: The source of the error.
  /// return: The error.
  pub fn new(msg: &str, source: Option<Box<dyn std::error::Error + Send + Sync>>) -> Self {
    Self {
      msg: msg.to_string(),
      source,
    }
  }
  pub fn message(&self) -> &str {
    &self.msg
  }
}

impl std::convert::From<gltf::Error> for HalaMeshletError {
  fn from(err: gltf::Error) -> Self {
    Self {
      msg: format!("glTF error: {}", err),
      source: Some(Box::new(err)),
    }
  }
}

impl std::convert::From<serde_json::Error> for HalaMeshletError {
  fn from(err: serde_json::Error) -> Self {
    Self {
      msg: format!("JSON error at line {} column {}: {}", err.line(), err.column(), err),
      source: Some(Box::new(err)),
    }
  }
}

/// The implementation Display trait for the error type of the hala-meshlet crate.
impl std::fmt::Display for HalaMeshletError {
  /// Format the error.
  /// param f: The formatter.
  /// return: The result.
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    write!(f, "{}", self.msg)
  }
}
