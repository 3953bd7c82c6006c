mod area;
mod frontswap;

pub use area::SwapArea;
pub use frontswap::Frontswap;

pub(crate) use frontswap::AreaList;
