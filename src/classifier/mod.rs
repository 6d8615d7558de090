// Reply classification — decides which labels a reply deserves.
//
// The ReplyClassifier trait is the seam. ChatClassifier implements it with an
// OpenAI-compatible chat completions server (LM Studio by default), and
// ReplyPipeline turns a classified reply into emit calls against the relay.

pub mod chat;
pub mod pipeline;
pub mod traits;
