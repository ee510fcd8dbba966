mod ajax;
mod common;
mod lifecycle;
mod navigation;
