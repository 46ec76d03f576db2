mod control_plane;
mod process;

pub use self::{
    control_plane::ControlPlane,
    process::{Process, ProcessId},
};
