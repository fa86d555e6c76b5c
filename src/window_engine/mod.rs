pub mod glfw_window_engine;
pub mod r#trait;

pub use self::glfw_window_engine::GlfwWindowEngine;
pub use self::r#trait::WindowEngine;
