pub mod planarity;
