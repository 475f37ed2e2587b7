pub mod build;
pub mod example_project;
pub mod new_project;

pub use build::BuildCommand;
pub(crate) use build::CargoOptions;
pub use example_project::ExampleCommand;
pub use new_project::NewCommand;
