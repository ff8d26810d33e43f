//! Domain service process supervision.

pub mod protocol;
mod supervisor;

pub use supervisor::{
    ServiceInbound, ServiceLaunchPlan, ServiceProcessHandle, ServiceSupervisor, ROOT_KEY_FLAG,
    STORAGE_DIRECTORY_FLAG,
};
