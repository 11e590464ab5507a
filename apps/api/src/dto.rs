mod channels;
mod common;
mod groups;
mod internal;
mod roles;

pub use channels::{
    ChannelResponse, ConnectionsRequest, CreateChannelRequest, SetParentGroupRequest,
};
pub use common::{HealthResponse, PageParams};
pub use groups::{
    AddParentRequest, ChildrenRequest, CreateGroupRequest, GroupListParams, GroupResponse,
    HierarchyEntryResponse, HierarchyParams, UpdateGroupRequest,
};
pub use internal::{AuthorizeRequest, AuthorizeResponse, EntitySummaryResponse};
pub use roles::{
    ActionsRequest, CheckResponse, CreateRoleRequest, EntityMemberResponse, MembersRequest,
    RenameRoleRequest, RoleResponse,
};
