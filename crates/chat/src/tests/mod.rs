//! End-to-end conversation scenarios against scripted providers.

mod conversation;
