//! Podcast task lifecycle
//!
//! A task is created from a [`CreatePodcastRequest`], driven through one or
//! more vendor sessions by the [`Orchestrator`] (resuming after the last
//! finished round on each retry), then finalized: merged audio and subtitles
//! are uploaded and the submitter's callback is notified.

mod model;
mod orchestrator;
mod request;

pub use model::{RoundUpload, Task, TaskSnapshot, TaskStatus};
pub use orchestrator::{Orchestrator, TaskTable};
pub use request::{
    AudioConfig, CreatePodcastRequest, InputInfo, NlpText, RetryInfo, SpeakerInfo,
    StartSessionPayload, SynthesisParams, ACTION_DIALOGUE, ACTION_PROMPT, ACTION_SUMMARIZE,
};
