//! Skeleton value types handed over by the tracking driver.
//!
//! Everything here is plain data: a `Joint` per tracked landmark, a
//! `BodyPart` per body side and a `User` snapshot rebuilt every frame.

pub mod joint;
pub mod user;

pub use joint::{BodySide, Joint, JointKind, MIN_JOINT_CONFIDENCE, is_acceptable};
pub use user::{BodyPart, User, UserId};
