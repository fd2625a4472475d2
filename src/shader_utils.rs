//! WGSL helpers shared by every GPU kernel.
//!
//! These are line-for-line counterparts of [`crate::random`] and
//! [`SpeciesMode::mask`](crate::species::SpeciesMode::mask): the GPU backend
//! produces the same integer hashes and masks as the CPU backend.
//!
//! # Available Functions
//!
//! ## Random & Hash
//! - `hash(seed: u32) -> u32` - avalanche hash
//! - `unit_fraction(h: u32) -> f32` - map a hash to `[0, 1]`
//! - `unit_disk_sample(seed: ptr<function, u32>) -> vec3<f32>` - center-biased
//!   disk point in `xy`, inward heading in `z`; advances `seed`
//!
//! ## Species
//! - `species_mask(index: u32, count: u32) -> vec4<i32>` - affinity mask

/// WGSL code for hash randomness.
pub const RANDOM_WGSL: &str = r#"
const PI: f32 = 3.14159265358979;
const TAU: f32 = 6.28318530717959;

fn hash(seed: u32) -> u32 {
    var x = seed ^ 2447636419u;
    x = x * 2654435769u;
    x = x ^ (x >> 16u);
    x = x * 2654435769u;
    x = x ^ (x >> 16u);
    return x * 2654435769u;
}

// Divisor is u32::MAX rounded to f32, as on the CPU.
fn unit_fraction(h: u32) -> f32 {
    return f32(h) / 4294967296.0;
}

// Squared radius: deliberately biased toward the center.
fn unit_disk_sample(seed: ptr<function, u32>) -> vec3<f32> {
    let arg_seed = hash(*seed);
    let abs_seed = hash(arg_seed);
    *seed = abs_seed;

    let arg = unit_fraction(arg_seed) * TAU;
    var r = unit_fraction(abs_seed);
    r = r * r;
    return vec3<f32>(r * cos(arg), r * sin(arg), arg + PI);
}
"#;

/// WGSL code for species affinity masks.
pub const SPECIES_WGSL: &str = r#"
fn species_mask(index: u32, count: u32) -> vec4<i32> {
    if count == 2u {
        let b = i32(index % 2u);
        return vec4<i32>(0, b, 1 - b, 1);
    }
    if count == 3u {
        let m = index % 3u;
        return vec4<i32>(select(0, 1, m == 2u), select(0, 1, m == 1u), select(0, 1, m == 0u), 1);
    }
    return vec4<i32>(0, 1, 1, 1);
}
"#;

/// All shared helpers combined.
pub fn all_utils_wgsl() -> String {
    format!("// Shared helpers\n{}\n{}\n", RANDOM_WGSL, SPECIES_WGSL)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn validate_wgsl(code: &str) -> Result<(), String> {
        let module = naga::front::wgsl::parse_str(code)
            .map_err(|e| format!("WGSL parse error: {:?}", e))?;

        let mut validator = naga::valid::Validator::new(
            naga::valid::ValidationFlags::all(),
            naga::valid::Capabilities::all(),
        );
        validator
            .validate(&module)
            .map_err(|e| format!("WGSL validation error: {:?}", e))?;

        Ok(())
    }

    fn wrap(utils: &str) -> String {
        format!(
            r#"{utils}

@group(0) @binding(0) var<storage, read_write> results: array<vec4<f32>>;

@compute @workgroup_size(256)
fn main(@builtin(global_invocation_id) gid: vec3<u32>) {{
    var seed = hash(gid.x);
    let s = unit_disk_sample(&seed);
    let m = vec4<f32>(species_mask(gid.x, 3u));
    results[gid.x] = vec4<f32>(s.xy, unit_fraction(seed), s.z) + m;
}}
"#
        )
    }

    #[test]
    fn test_utils_validate() {
        let code = wrap(&all_utils_wgsl());
        if let Err(e) = validate_wgsl(&code) {
            panic!("{}\n\nCode:\n{}", e, code);
        }
    }

    #[test]
    fn test_hash_constants_match_cpu() {
        assert!(RANDOM_WGSL.contains("2447636419u"));
        assert_eq!(RANDOM_WGSL.matches("2654435769u").count(), 3);
        assert_eq!(u32::MAX as f32, 4294967296.0);
    }

    #[test]
    fn test_mask_cases_present() {
        assert!(SPECIES_WGSL.contains("count == 2u"));
        assert!(SPECIES_WGSL.contains("count == 3u"));
    }
}
