mod conversions;
mod types;

pub use types::{
    AddParentRequest, ChildrenRequest, CreateGroupRequest, GroupListParams, GroupResponse,
    HierarchyEntryResponse, HierarchyParams, UpdateGroupRequest,
};
