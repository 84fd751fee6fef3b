// All core functionality is in reflow-core
// This CLI acts as a thin wrapper around the core library

// CLI-specific modules
pub mod libretranslate;

// Re-export core types for convenience
pub use reflow_core::*;

// Re-export CLI utilities
pub use libretranslate::LibreTranslateClient;
