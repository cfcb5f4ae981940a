//! Reserved property names.
//!
//! The `hlms_` namespace is populated by the external material/renderable
//! binder before each render; templates test these names with `@property`
//! guards. Material implementations add their own ad hoc names on top
//! (e.g. `diffuse_map`, `lights_directional_count`).

use crate::utils::interner;

pub const SKELETON: &str = "hlms_skeleton";
pub const BONES_PER_VERTEX: &str = "hlms_bones_per_vertex";
pub const POSE: &str = "hlms_pose";

pub const NORMAL: &str = "hlms_normal";
pub const QTANGENT: &str = "hlms_qtangent";
pub const COLOUR: &str = "hlms_colour";

pub const UV_COUNT: &str = "hlms_uv_count";
pub const UV_COUNT_N: [&str; 8] = [
    "hlms_uv_count0",
    "hlms_uv_count1",
    "hlms_uv_count2",
    "hlms_uv_count3",
    "hlms_uv_count4",
    "hlms_uv_count5",
    "hlms_uv_count6",
    "hlms_uv_count7",
];

pub const LIGHTS_DIRECTIONAL: &str = "hlms_lights_directional";
pub const LIGHTS_POINT: &str = "hlms_lights_point";
pub const LIGHTS_SPOT: &str = "hlms_lights_spot";
pub const LIGHTS_ATTENUATION: &str = "hlms_lights_attenuation";
pub const LIGHTS_SPOTPARAMS: &str = "hlms_lights_spotparams";

pub const DUAL_PARABOLOID_MAPPING: &str = "hlms_dual_paraboloid_mapping";
pub const NUM_SHADOW_MAPS: &str = "hlms_num_shadow_maps";
pub const PSSM_SPLITS: &str = "hlms_pssm_splits";
pub const SHADOW_CASTER: &str = "hlms_shadowcaster";

/// Pre-interns the reserved names.
///
/// Called once at cache construction so the hot property-binding path
/// never has to grow the intern pool for well-known names.
pub fn preload_reserved_names() {
    let reserved = [
        SKELETON,
        BONES_PER_VERTEX,
        POSE,
        NORMAL,
        QTANGENT,
        COLOUR,
        UV_COUNT,
        LIGHTS_DIRECTIONAL,
        LIGHTS_POINT,
        LIGHTS_SPOT,
        LIGHTS_ATTENUATION,
        LIGHTS_SPOTPARAMS,
        DUAL_PARABOLOID_MAPPING,
        NUM_SHADOW_MAPS,
        PSSM_SPLITS,
        SHADOW_CASTER,
    ];

    for name in reserved {
        interner::intern(name);
    }
    for name in UV_COUNT_N {
        interner::intern(name);
    }
}
