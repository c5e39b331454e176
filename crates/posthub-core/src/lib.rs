//! Pure logic shared by the PostHub service: search ranking, avatar
//! selection, identity tags, the weekly reward draw and the notification
//! inbox. Nothing in here touches the network or the database.

pub mod avatar;
pub mod draw;
pub mod identity;
pub mod inbox;
pub mod ranking;
pub mod text;
