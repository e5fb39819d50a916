pub mod adapter;
pub mod config;
pub mod date;
pub mod docket;
pub mod error;
pub mod fetch;
pub mod locate;
pub mod model;
pub mod page;
pub mod parse;
pub mod party;
pub mod text;
pub mod wait;

pub use adapter::{
    CourtAdapter, ExtractionContext, HomepageRules, Parties, Pje1gTjba, Pje1gTrt5, ProjudiTjba, Session, UrlPattern,
    fetch_case_info, try_fetch_case_info,
};
pub use config::{ScrapeConfig, ScrapeConfigBuilder};
pub use date::DateFormat;
pub use error::{Result, ScrapeError};
#[cfg(feature = "fetch")]
pub use fetch::HttpFetcher;
pub use fetch::{FetchConfig, LegacyFetcher, NoFetch};
pub use model::{Case, CourtSystem, DocketEntry, ExtractionStep, JudicialUnit, Party, PartyRole, StepFailure, Tag, TaxId};
pub use page::{FrameSnapshot, Mutation, Page, ReadyState, ScriptedPage};
pub use parse::{Document, Element};
pub use wait::{CancelToken, NodeSnapshot, WaitOptions, wait_for, wait_for_frame_settled};
