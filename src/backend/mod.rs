// Backend module - Vulkan bootstrap pipeline
//
// Each stage lives in its own module and talks to Vulkan only through the
// `Driver` trait, so the whole pipeline runs against `mock::MockDriver`
// in tests and `AshDriver` in the application.

pub mod ash_driver;
pub mod device;
pub mod driver;
pub mod error;
pub mod image_view;
pub mod instance;
pub mod logical_device;
pub mod queue;
pub mod surface;
pub mod swapchain;
pub mod validation;

#[cfg(test)]
pub mod mock;

pub use ash_driver::AshDriver;
