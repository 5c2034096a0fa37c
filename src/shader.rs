//! Shader selection flags.
//!
//! A shader mask is a bag of capability bits, one pair per exclusive
//! choice: shading model, texturing, depth testing, projection kind,
//! texture wrapping and texture filtering. A mask is consistent when
//! exactly one bit of each pair is set; [`normalize`] restores consistency
//! and degrades requests to the nearest variant present in the compiled-in
//! shader set.

/// Flat shading: one color per face.
pub const FLAT: u32 = 1 << 0;
/// Gouraud shading: per-vertex colors interpolated across the face.
pub const GOURAUD: u32 = 1 << 1;
/// No texture lookup; faces use their shaded color.
pub const NOTEXTURE: u32 = 1 << 2;
/// Texture lookup, modulated by the shaded color.
pub const TEXTURE: u32 = 1 << 3;
/// No depth testing.
pub const NOZBUFFER: u32 = 1 << 4;
/// Depth test and write per fragment.
pub const ZBUFFER: u32 = 1 << 5;
/// Perspective projection: perspective-correct attribute interpolation.
pub const PERSPECTIVE: u32 = 1 << 6;
/// Orthographic projection: affine attribute interpolation.
pub const ORTHO: u32 = 1 << 7;
/// Texture coordinates clamp to the texture edges.
pub const TEXTURE_CLAMP: u32 = 1 << 8;
/// Texture coordinates wrap; assumes power-of-two texture dimensions.
pub const TEXTURE_WRAP_POW2: u32 = 1 << 9;
/// Nearest-texel sampling.
pub const TEXTURE_NEAREST: u32 = 1 << 10;
/// Bilinear sampling of the four surrounding texels.
pub const TEXTURE_BILINEAR: u32 = 1 << 11;

/// Every capability. The default compiled-in set of [`crate::Renderer`].
pub const ALL: u32 = FLAT
    | GOURAUD
    | NOTEXTURE
    | TEXTURE
    | NOZBUFFER
    | ZBUFFER
    | PERSPECTIVE
    | ORTHO
    | TEXTURE_CLAMP
    | TEXTURE_WRAP_POW2
    | TEXTURE_NEAREST
    | TEXTURE_BILINEAR;

// (first, second, fallback-winner) per exclusive pair. The winner is the
// cheaper variant, which is also the one every build carries.
const GROUPS: [(u32, u32, u32); 6] = [
    (FLAT, GOURAUD, FLAT),
    (NOTEXTURE, TEXTURE, NOTEXTURE),
    (NOZBUFFER, ZBUFFER, NOZBUFFER),
    (PERSPECTIVE, ORTHO, PERSPECTIVE),
    (TEXTURE_WRAP_POW2, TEXTURE_CLAMP, TEXTURE_WRAP_POW2),
    (TEXTURE_NEAREST, TEXTURE_BILINEAR, TEXTURE_NEAREST),
];

/// Make `mask` consistent: exactly one choice per exclusive group, and no
/// choice outside the `enabled` capability set when its partner is
/// available. Requests for missing capabilities silently fall back.
pub fn normalize(mask: u32, enabled: u32) -> u32 {
    let mut out = 0;
    for &(a, b, prefer) in GROUPS.iter() {
        let mut pick = match (mask & a != 0, mask & b != 0) {
            (true, false) => a,
            (false, true) => b,
            // Both or neither: take the preferred (always-compiled) one.
            _ => prefer,
        };
        if enabled & pick == 0 {
            let other = if pick == a { b } else { a };
            if enabled & other != 0 {
                pick = other;
            }
        }
        out |= pick;
    }
    out
}

#[inline]
pub(crate) fn has(mask: u32, bit: u32) -> bool {
    mask & bit != 0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_mask_normalizes_to_defaults() {
        let m = normalize(0, ALL);
        assert_eq!(
            m,
            FLAT | NOTEXTURE | NOZBUFFER | PERSPECTIVE | TEXTURE_WRAP_POW2 | TEXTURE_NEAREST
        );
    }

    #[test]
    fn double_bits_resolve_to_preferred() {
        let m = normalize(FLAT | GOURAUD | TEXTURE | NOTEXTURE, ALL);
        assert!(has(m, FLAT) && !has(m, GOURAUD));
        assert!(has(m, NOTEXTURE) && !has(m, TEXTURE));
    }

    #[test]
    fn normalization_is_idempotent() {
        for mask in [0, ALL, GOURAUD | TEXTURE | ZBUFFER | ORTHO].iter() {
            let once = normalize(*mask, ALL);
            assert_eq!(normalize(once, ALL), once);
        }
    }

    #[test]
    fn missing_capability_falls_back() {
        let enabled = ALL & !TEXTURE_BILINEAR;
        let m = normalize(TEXTURE | TEXTURE_BILINEAR, enabled);
        assert!(has(m, TEXTURE_NEAREST) && !has(m, TEXTURE_BILINEAR));
        // The rest of the request survives.
        assert!(has(m, TEXTURE));
    }

    #[test]
    fn fallback_keeps_choice_when_neither_available() {
        let enabled = ALL & !(ZBUFFER | NOZBUFFER);
        let m = normalize(ZBUFFER, enabled);
        assert!(has(m, ZBUFFER));
    }
}
