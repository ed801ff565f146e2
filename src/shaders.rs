//! WGSL compute kernels, kept as source constants and compiled at dispatch time.

/// Radix-2 DFT pipeline: a bit-reversal permutation pass, then one butterfly
/// pass per stage. `fft_stage` uses the forward (negative-angle) twiddles and
/// `ifft_stage` the positive ones; neither applies 1/N scaling.
///
/// The host dispatches n/2 threads per butterfly stage, one butterfly pair
/// per thread, with the stage index delivered through the params uniform.
pub const FFT: &str = r#"
struct Params {
    n: u32,
    stage: u32,
    bits: u32,
    _pad: u32,
}

@group(0) @binding(0) var<storage, read_write> data: array<vec2<f32>>;
@group(0) @binding(1) var<uniform> params: Params;

const PI: f32 = 3.14159265358979;

fn cmul(a: vec2<f32>, b: vec2<f32>) -> vec2<f32> {
    return vec2<f32>(a.x * b.x - a.y * b.y, a.x * b.y + a.y * b.x);
}

@compute @workgroup_size(64)
fn bit_reverse(@builtin(global_invocation_id) id: vec3<u32>) {
    let i = id.x;
    if (i >= params.n) {
        return;
    }
    let j = reverseBits(i) >> (32u - params.bits);
    if (i < j) {
        let tmp = data[i];
        data[i] = data[j];
        data[j] = tmp;
    }
}

@compute @workgroup_size(64)
fn fft_stage(@builtin(global_invocation_id) id: vec3<u32>) {
    let gid = id.x;
    if (gid >= params.n >> 1u) {
        return;
    }
    let half_size = 1u << params.stage;
    let full_size = half_size << 1u;
    let block = gid / half_size;
    let pair = gid % half_size;
    let i = block * full_size + pair;
    let j = i + half_size;

    let angle = -2.0 * PI * f32(pair) / f32(full_size);
    let w = vec2<f32>(cos(angle), sin(angle));
    let a = data[i];
    let wb = cmul(w, data[j]);
    data[i] = a + wb;
    data[j] = a - wb;
}

@compute @workgroup_size(64)
fn ifft_stage(@builtin(global_invocation_id) id: vec3<u32>) {
    let gid = id.x;
    if (gid >= params.n >> 1u) {
        return;
    }
    let half_size = 1u << params.stage;
    let full_size = half_size << 1u;
    let block = gid / half_size;
    let pair = gid % half_size;
    let i = block * full_size + pair;
    let j = i + half_size;

    let angle = 2.0 * PI * f32(pair) / f32(full_size);
    let w = vec2<f32>(cos(angle), sin(angle));
    let a = data[i];
    let wb = cmul(w, data[j]);
    data[i] = a + wb;
    data[j] = a - wb;
}
"#;
