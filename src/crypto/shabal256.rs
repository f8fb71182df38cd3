//! Scalar Shabal-256 with the custom initialization vectors used by the
//! capacity lottery, plus the reduced "lite" evaluator that turns a scoop
//! and a generation signature into a 64-bit quality.
//!
//! The permutation schedule is expressed in closed form: step `j` of the 48
//! touches `a[j % 12]` / `b[j % 16]` with the companion indices offset by
//! 11, 13, 9 and 6, the C word walking `8, 7, .., 0, 15, .., 9` and the
//! message word repeating in order. This reproduces the three unrolled
//! groups of sixteen steps exactly.

pub const A_INIT: [u32; 12] = [
    0x52F84552, 0xE54B7999, 0x2D8EE3EC, 0xB9645191, 0xE0078B86, 0xBB7C44C9, 0xD2B5C1CA, 0xB0D2EB8C,
    0x14CE5A45, 0x22AF50DC, 0xEFFDBC6B, 0xEB21B74A,
];

pub const B_INIT: [u32; 16] = [
    0xB555C6EE, 0x3E710596, 0xA72A652F, 0x9301515F, 0xDA28C1FA, 0x696FD868, 0x9CB6BF72, 0x0AFE4002,
    0xA6E03615, 0x5138C1D4, 0xBE216306, 0xB38B8890, 0x3EA8B96B, 0x3299ACE4, 0x30924DD4, 0x55CB34A5,
];

pub const C_INIT: [u32; 16] = [
    0xB405F031, 0xC4233EBA, 0xB3733979, 0xC0DD9D55, 0xC51C28AE, 0xA327B8E1, 0x56C56167, 0xED614433,
    0x88B59D60, 0x60E2CEBA, 0x758B4B8B, 0x83E82A7F, 0xBC968828, 0xE6E00BF7, 0xBA839E55, 0x9B491C60,
];

struct Shabal {
    a: [u32; 12],
    b: [u32; 16],
    c: [u32; 16],
    w_low: u32,
    w_high: u32,
}

impl Shabal {
    fn new() -> Self {
        Shabal {
            a: A_INIT,
            b: B_INIT,
            c: C_INIT,
            w_low: 1,
            w_high: 0,
        }
    }

    #[inline]
    fn perm(&mut self, m: &[u32; 16]) {
        for j in 0..48usize {
            let xa0 = j % 12;
            let xa1 = (j + 11) % 12;
            let xb0 = j % 16;
            let xb1 = (j + 13) % 16;
            let xb2 = (j + 9) % 16;
            let xb3 = (j + 6) % 16;
            let xc = self.c[(16 + 8 - (j % 16)) % 16];
            let xm = m[j % 16];

            let t = (self.a[xa0] ^ self.a[xa1].rotate_left(15).wrapping_mul(5) ^ xc)
                .wrapping_mul(3)
                ^ self.b[xb1]
                ^ (self.b[xb2] & !self.b[xb3])
                ^ xm;
            self.a[xa0] = t;
            self.b[xb0] = !(self.b[xb0].rotate_left(1) ^ t);
        }
    }

    #[inline]
    fn apply_p(&mut self, m: &[u32; 16]) {
        for word in self.b.iter_mut() {
            *word = word.rotate_left(17);
        }
        self.perm(m);
        for i in 0..12 {
            self.a[i] = self.a[i]
                .wrapping_add(self.c[(i + 11) % 16])
                .wrapping_add(self.c[(i + 15) % 16])
                .wrapping_add(self.c[(i + 3) % 16]);
        }
    }

    #[inline]
    fn xor_w(&mut self) {
        self.a[0] ^= self.w_low;
        self.a[1] ^= self.w_high;
    }

    #[inline]
    fn incr_w(&mut self) {
        self.w_low = self.w_low.wrapping_add(1);
        if self.w_low == 0 {
            self.w_high = self.w_high.wrapping_add(1);
        }
    }

    /// One full compression round: absorb `m`, permute, subtract, swap.
    fn compress(&mut self, m: &[u32; 16]) {
        for i in 0..16 {
            self.b[i] = self.b[i].wrapping_add(m[i]);
        }
        self.xor_w();
        self.apply_p(m);
        for i in 0..16 {
            self.c[i] = self.c[i].wrapping_sub(m[i]);
        }
        std::mem::swap(&mut self.b, &mut self.c);
        self.incr_w();
    }

    /// Terminal block plus the three finalization rounds.
    fn finish(&mut self, term: &[u32; 16]) {
        for i in 0..16 {
            self.b[i] = self.b[i].wrapping_add(term[i]);
        }
        self.xor_w();
        self.apply_p(term);

        for _ in 0..3 {
            std::mem::swap(&mut self.b, &mut self.c);
            self.xor_w();
            self.apply_p(term);
        }
    }

    fn output(&self) -> [u8; 32] {
        let mut out = [0u8; 32];
        for (i, word) in self.b[8..16].iter().enumerate() {
            out[i * 4..i * 4 + 4].copy_from_slice(&word.to_le_bytes());
        }
        out
    }
}

#[inline]
fn load_block(bytes: &[u8]) -> [u32; 16] {
    let mut m = [0u32; 16];
    for (i, chunk) in bytes.chunks_exact(4).enumerate() {
        m[i] = u32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]);
    }
    m
}

/// Shabal-256 over `data`, an optional extra block absorbed before
/// termination, and the mandatory terminal block.
///
/// Only whole 64-byte blocks of `data` are absorbed; a trailing partial
/// block is ignored. Callers that need it fold those bytes into the
/// `pre_term` block (the plot chain does exactly this with its seed
/// carrier block).
pub fn shabal256(data: &[u8], pre_term: Option<&[u32; 16]>, term: &[u32; 16]) -> [u8; 32] {
    let mut state = Shabal::new();
    for block in data.chunks_exact(64) {
        let m = load_block(block);
        state.compress(&m);
    }
    if let Some(block) = pre_term {
        state.compress(block);
    }
    state.finish(term);
    state.output()
}

/// Reduced quality evaluator: one 64-byte scoop plus the 32-byte generation
/// signature, returning the low 64 output bits.
///
/// Structurally this is `shabal256` with the input block
/// `gensig ‖ scoop[0..32]` and the terminal block `scoop[32..64] ‖ 0x80-pad`;
/// the reduction exists so quality scans touch exactly two compression
/// rounds and the finalization.
pub fn shabal256_lite(data: &[u8; 64], gensig: &[u8; 32]) -> u64 {
    let mut first = [0u8; 64];
    first[..32].copy_from_slice(gensig);
    first[32..].copy_from_slice(&data[..32]);

    let mut term = [0u32; 16];
    for (i, chunk) in data[32..].chunks_exact(4).enumerate() {
        term[i] = u32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]);
    }
    term[8] = 0x80;

    let out = shabal256(&first, None, &term);
    u64::from_le_bytes(out[..8].try_into().unwrap())
}
