pub mod anchor;
pub mod call;
pub mod canonical;
pub mod decision;
pub mod intent;
pub mod policy;
pub mod response;
pub mod session;
pub mod vector;

pub use anchor::*;
pub use call::*;
pub use canonical::*;
pub use decision::*;
pub use intent::*;
pub use policy::*;
pub use response::*;
pub use session::*;
pub use vector::*;
