//! Protobuf messages of the world payload.

use bytes::Bytes;

/// A decoded world: its size, named rasters and vector metadata.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct WorldData {
    /// World side length in metres, also the raster world size.
    #[prost(uint32, tag = "1")]
    pub size: u32,
    #[prost(message, repeated, tag = "2")]
    pub maps: Vec<MapData>,
    #[prost(message, repeated, tag = "3")]
    pub prefabs: Vec<PrefabData>,
    #[prost(message, repeated, tag = "4")]
    pub paths: Vec<PathData>,
}

/// A named raster blob.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct MapData {
    #[prost(string, tag = "1")]
    pub name: String,
    /// Channel-major raster bytes; a view into the decoded payload.
    #[prost(bytes = "bytes", tag = "2")]
    pub data: Bytes,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct PrefabData {
    #[prost(string, tag = "1")]
    pub category: String,
    #[prost(uint32, tag = "2")]
    pub id: u32,
    #[prost(message, optional, tag = "3")]
    pub position: Option<VectorData>,
    #[prost(message, optional, tag = "4")]
    pub rotation: Option<VectorData>,
    #[prost(message, optional, tag = "5")]
    pub scale: Option<VectorData>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct PathData {
    #[prost(string, tag = "1")]
    pub name: String,
    #[prost(bool, tag = "2")]
    pub spline: bool,
    #[prost(bool, tag = "3")]
    pub start: bool,
    #[prost(bool, tag = "4")]
    pub end: bool,
    #[prost(float, tag = "5")]
    pub width: f32,
    #[prost(float, tag = "6")]
    pub inner_padding: f32,
    #[prost(float, tag = "7")]
    pub outer_padding: f32,
    #[prost(float, tag = "8")]
    pub inner_fade: f32,
    #[prost(float, tag = "9")]
    pub outer_fade: f32,
    #[prost(float, tag = "10")]
    pub random_scale: f32,
    #[prost(float, tag = "11")]
    pub mesh_offset: f32,
    #[prost(float, tag = "12")]
    pub terrain_offset: f32,
    #[prost(int32, tag = "13")]
    pub splat: i32,
    #[prost(int32, tag = "14")]
    pub topology: i32,
    #[prost(message, repeated, tag = "15")]
    pub nodes: Vec<VectorData>,
}

#[derive(Clone, Copy, PartialEq, ::prost::Message)]
pub struct VectorData {
    #[prost(float, tag = "1")]
    pub x: f32,
    #[prost(float, tag = "2")]
    pub y: f32,
    #[prost(float, tag = "3")]
    pub z: f32,
}

impl VectorData {
    pub fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }
}
