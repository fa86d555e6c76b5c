pub mod callbacks;
pub use self::callbacks::{DispatchOutcome, SurfaceCallbacks, SurfaceEvent};

pub mod controller;
pub use self::controller::{LifecycleState, SurfaceLifecycleController, TeardownReport};

pub mod scene;
pub use self::scene::SceneSetup;
