pub mod category;
pub mod inspection;

pub use category::{
    CategoryEdit, CategoryMap, CategoryPushOutcome, CategorySyncRecord, PushResult,
};
pub use inspection::{Inspection, InspectionPatch, NewInspection, PushedEvent};
