pub mod chunker;
pub mod normalize;
pub mod segmentation;
pub mod streamer;
