// Label authority — the external service that signs and publishes labels.
//
// The relay never signs anything itself. LabelAuthority is the seam it
// delegates through; HttpLabelAuthority talks to a running labeler over its
// local port, and LabelerProcess can launch that labeler next to the relay.

pub mod http;
pub mod process;
pub mod traits;

pub use traits::{LabelAssertion, LabelAuthority};
