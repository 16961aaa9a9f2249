//! Graph message passing and hyperbolic graph convolution.

mod conv;
mod euclidean;
mod message_passing;

pub use self::conv::HyperbolicGraphConv;
pub use self::euclidean::GraphConv;
pub use self::message_passing::{aggregate, EdgeIndex, MessagePassing};
