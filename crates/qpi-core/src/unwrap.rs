//! 2D Phase Unwrapper — reliability-guided region merging
//!
//! Resolves an angle-valued (mod 2π) image into a continuous map by adding
//! the right multiple of 2π to every pixel. The algorithm trusts clean
//! regions first:
//!
//! 1. Score every pixel with a noise estimator built from second
//!    differences of its 8-neighbourhood (lower score = more reliable).
//! 2. Build one edge per adjacent pixel pair carrying the summed endpoint
//!    scores and the integer 2π step between their wrapped values.
//! 3. Sort edges ascending by score and merge pixel groups in that order,
//!    propagating the accumulated 2π offset through the absorbed group.
//! 4. Add `2π · increment` to every pixel.
//!
//! Merging most-reliable regions first confines noise-induced mistakes to
//! the noisy regions instead of letting them propagate streaks across the
//! image. Groups are kept in a union-find-like arena of index-linked
//! lists; the smaller group is always appended to the larger group's tail,
//! so total merge work stays O(N log N) alongside the edge sort.
//!
//! The result is one continuous representative of the input: congruent to
//! the wrapped map pixel-for-pixel (mod 2π), unique up to a single global
//! 2π multiple. Callers that need an absolute anchor subtract a statistic
//! of their choice afterwards (the phase engine uses the median).
//!
//! ## Example
//!
//! ```rust
//! use qpi_core::unwrap::{unwrap_phase, wrap_phase};
//!
//! // A steep ramp that wraps several times across 32 columns
//! let (w, h) = (32, 4);
//! let ramp: Vec<f64> = (0..w * h).map(|i| (i % w) as f64 * 0.7).collect();
//! let wrapped: Vec<f64> = ramp.iter().map(|&p| wrap_phase(p)).collect();
//!
//! let unwrapped = unwrap_phase(&wrapped, w, h);
//! // Adjacent steps are recovered exactly (up to one global 2π offset)
//! for row in unwrapped.chunks(w) {
//!     for pair in row.windows(2) {
//!         assert!((pair[1] - pair[0] - 0.7).abs() < 1e-9);
//!     }
//! }
//! ```

use std::f64::consts::PI;

const TWO_PI: f64 = 2.0 * PI;

/// Index sentinel for "no neighbour" in the group lists.
const NONE: u32 = u32::MAX;

/// Reliability assigned to pixels with no computed estimate (borders when
/// wrap-around is off). Far above any achievable second-difference score,
/// so these pixels always merge last.
const BORDER_RELIABILITY: f64 = 1.0e7;

/// Span of the pseudo-random jitter added to border reliabilities. The
/// jitter only fixes an arbitrary order among otherwise tied pixels; it
/// can never change which unwrap solutions are valid.
const BORDER_JITTER: f64 = 1.0e4;

/// Configuration for the 2D unwrapper.
#[derive(Debug, Clone, Copy)]
pub struct UnwrapConfig {
    /// Treat the left and right image borders as adjacent (toroidal x).
    /// Default: false
    pub wrap_around_x: bool,
    /// Treat the top and bottom image borders as adjacent (toroidal y).
    /// Default: false
    pub wrap_around_y: bool,
    /// Seed for the tie-break jitter. Identical seeds reproduce identical
    /// outputs bit-for-bit. Default: 42
    pub seed: u64,
}

impl Default for UnwrapConfig {
    fn default() -> Self {
        Self {
            wrap_around_x: false,
            wrap_around_y: false,
            seed: 42,
        }
    }
}

/// One pixel record in the group arena.
///
/// `head` always names the group's current canonical representative;
/// `last` and `group_size` are only meaningful on the head itself.
#[derive(Debug, Clone, Copy)]
struct PixelNode {
    /// Multiples of 2π still owed to this pixel
    increment: i32,
    /// Noise-sensitivity score; lower is trusted earlier
    reliability: f64,
    /// Canonical representative of the group containing this pixel
    head: u32,
    /// Tail of the group list (valid on the head)
    last: u32,
    /// Next pixel in the group list, or NONE
    next: u32,
    /// Member count (valid on the head)
    group_size: u32,
}

/// One adjacency between two pixels.
#[derive(Debug, Clone, Copy)]
struct Edge {
    /// Sum of the endpoint reliabilities; lower merges earlier
    reliability: f64,
    a: u32,
    b: u32,
    /// Signed 2π cycles separating the endpoints' wrapped values
    wrap: i8,
}

/// Reliability-guided 2D phase unwrapper.
///
/// Each call is self-contained: the pixel arena and edge list are rebuilt
/// from scratch, only their backing allocations are reused between calls
/// of the same frame size.
#[derive(Debug, Default)]
pub struct Unwrapper2D {
    config: UnwrapConfig,
    nodes: Vec<PixelNode>,
    edges: Vec<Edge>,
}

impl Unwrapper2D {
    /// Create a new unwrapper.
    pub fn new(config: UnwrapConfig) -> Self {
        Self {
            config,
            nodes: Vec::new(),
            edges: Vec::new(),
        }
    }

    /// Current configuration.
    pub fn config(&self) -> &UnwrapConfig {
        &self.config
    }

    /// Unwrap a row-major wrapped phase map, returning a new buffer.
    pub fn unwrap(&mut self, wrapped: &[f64], width: usize, height: usize) -> Vec<f64> {
        let mut out = Vec::new();
        self.unwrap_into(wrapped, width, height, &mut out);
        out
    }

    /// Like [`Self::unwrap`] but reuses the output allocation.
    pub fn unwrap_into(
        &mut self,
        wrapped: &[f64],
        width: usize,
        height: usize,
        out: &mut Vec<f64>,
    ) {
        assert_eq!(wrapped.len(), width * height);
        assert!(
            wrapped.len() < NONE as usize,
            "frame too large for u32 pixel indices"
        );

        out.clear();
        out.extend_from_slice(wrapped);
        if wrapped.len() < 2 {
            return;
        }

        self.init_nodes(wrapped.len());
        self.score_reliability(wrapped, width, height);
        self.build_edges(wrapped, width, height);
        quicksort(&mut self.edges);
        self.merge_groups();

        for (value, node) in out.iter_mut().zip(self.nodes.iter()) {
            *value += TWO_PI * node.increment as f64;
        }
    }

    /// Reset every pixel to its own single-member group with a jittered
    /// sentinel reliability.
    fn init_nodes(&mut self, count: usize) {
        self.nodes.clear();
        self.nodes.reserve(count);

        let mut rng_state = self.config.seed.max(1);
        for i in 0..count {
            let jitter = xorshift64(&mut rng_state);
            self.nodes.push(PixelNode {
                increment: 0,
                reliability: BORDER_RELIABILITY + jitter * BORDER_JITTER,
                head: i as u32,
                last: i as u32,
                next: NONE,
                group_size: 1,
            });
        }
    }

    /// Second-difference noise estimator over the 8-neighbourhood.
    ///
    /// Pixels whose full neighbourhood exists (interior pixels, or border
    /// pixels when the corresponding wrap-around is enabled) get the sum of
    /// squared horizontal, vertical, and diagonal second differences; the
    /// rest keep their sentinel score.
    fn score_reliability(&mut self, wrapped: &[f64], width: usize, height: usize) {
        for y in 0..height {
            let y_ok = (y > 0 && y < height - 1) || self.config.wrap_around_y;
            if !y_ok {
                continue;
            }
            let ym = if y == 0 { height - 1 } else { y - 1 };
            let yp = if y == height - 1 { 0 } else { y + 1 };

            for x in 0..width {
                let x_ok = (x > 0 && x < width - 1) || self.config.wrap_around_x;
                if !x_ok {
                    continue;
                }
                let xm = if x == 0 { width - 1 } else { x - 1 };
                let xp = if x == width - 1 { 0 } else { x + 1 };

                let centre = wrapped[y * width + x];
                let h = wrap_to_pi(wrapped[y * width + xm] - centre)
                    - wrap_to_pi(centre - wrapped[y * width + xp]);
                let v = wrap_to_pi(wrapped[ym * width + x] - centre)
                    - wrap_to_pi(centre - wrapped[yp * width + x]);
                let d1 = wrap_to_pi(wrapped[ym * width + xm] - centre)
                    - wrap_to_pi(centre - wrapped[yp * width + xp]);
                let d2 = wrap_to_pi(wrapped[ym * width + xp] - centre)
                    - wrap_to_pi(centre - wrapped[yp * width + xm]);

                self.nodes[y * width + x].reliability = h * h + v * v + d1 * d1 + d2 * d2;
            }
        }
    }

    /// One edge per horizontal pair, one per vertical pair, plus the
    /// boundary pairs when wrap-around is enabled.
    fn build_edges(&mut self, wrapped: &[f64], width: usize, height: usize) {
        self.edges.clear();
        let horizontal = height * width.saturating_sub(1);
        let vertical = width * height.saturating_sub(1);
        self.edges.reserve(horizontal + vertical + width + height);

        let push = |edges: &mut Vec<Edge>, a: usize, b: usize| {
            edges.push(Edge {
                reliability: self.nodes[a].reliability + self.nodes[b].reliability,
                a: a as u32,
                b: b as u32,
                wrap: find_wrap(wrapped[a], wrapped[b]),
            });
        };

        for y in 0..height {
            for x in 0..width - 1 {
                let a = y * width + x;
                push(&mut self.edges, a, a + 1);
            }
        }
        if self.config.wrap_around_x && width > 1 {
            for y in 0..height {
                push(&mut self.edges, y * width + width - 1, y * width);
            }
        }

        for y in 0..height - 1 {
            for x in 0..width {
                let a = y * width + x;
                push(&mut self.edges, a, a + width);
            }
        }
        if self.config.wrap_around_y && height > 1 {
            for x in 0..width {
                push(&mut self.edges, (height - 1) * width + x, x);
            }
        }
    }

    /// Walk the sorted edges, merging groups smaller-into-larger.
    ///
    /// An edge between two pixels already in one group is a no-op: once
    /// merged, an edge never re-adjusts its group.
    fn merge_groups(&mut self) {
        for k in 0..self.edges.len() {
            let edge = self.edges[k];
            let a = edge.a as usize;
            let b = edge.b as usize;

            let head_a = self.nodes[a].head;
            let head_b = self.nodes[b].head;
            if head_a == head_b {
                continue;
            }

            let size_a = self.nodes[head_a as usize].group_size;
            let size_b = self.nodes[head_b as usize].group_size;
            if size_a >= size_b {
                // Absorb b's group; offset chosen so the edge becomes
                // continuous: b ends up at increment(a) - wrap.
                let offset =
                    self.nodes[a].increment - edge.wrap as i32 - self.nodes[b].increment;
                self.absorb(head_a, head_b, offset);
            } else {
                let offset =
                    self.nodes[b].increment + edge.wrap as i32 - self.nodes[a].increment;
                self.absorb(head_b, head_a, offset);
            }
        }
    }

    /// Append the `from` group to `into`'s tail, retagging every absorbed
    /// member and adding the wrap offset to it.
    fn absorb(&mut self, into: u32, from: u32, offset: i32) {
        let tail = self.nodes[into as usize].last;
        self.nodes[tail as usize].next = from;
        self.nodes[into as usize].last = self.nodes[from as usize].last;
        self.nodes[into as usize].group_size += self.nodes[from as usize].group_size;

        let mut cursor = from;
        while cursor != NONE {
            let node = &mut self.nodes[cursor as usize];
            node.head = into;
            node.increment += offset;
            cursor = node.next;
        }
    }
}

/// Unwrap with the default configuration (no wrap-around, fixed seed).
pub fn unwrap_phase(wrapped: &[f64], width: usize, height: usize) -> Vec<f64> {
    Unwrapper2D::new(UnwrapConfig::default()).unwrap(wrapped, width, height)
}

/// Wrap an arbitrary angle into [-π, π).
#[inline]
pub fn wrap_phase(phase: f64) -> f64 {
    (phase + PI).rem_euclid(TWO_PI) - PI
}

/// Map a phase difference into [-π, π].
///
/// Inputs are differences of already-wrapped values, so one correction of
/// ±2π is always enough.
#[inline]
pub fn wrap_to_pi(diff: f64) -> f64 {
    if diff > PI {
        diff - TWO_PI
    } else if diff < -PI {
        diff + TWO_PI
    } else {
        diff
    }
}

/// Signed number of 2π cycles separating two wrapped values: -1, 0 or 1.
#[inline]
fn find_wrap(a: f64, b: f64) -> i8 {
    let difference = a - b;
    if difference > PI {
        -1
    } else if difference < -PI {
        1
    } else {
        0
    }
}

/// Uniform pseudo-random value in [0, 1) from a xorshift64 state.
#[inline]
fn xorshift64(state: &mut u64) -> f64 {
    *state ^= *state << 13;
    *state ^= *state >> 7;
    *state ^= *state << 17;
    (*state as f64) / (u64::MAX as f64)
}

const INSERTION_CUTOFF: usize = 16;

/// Ascending quicksort by edge reliability: median-of-three pivot,
/// three-way partition, insertion sort below the cutoff.
///
/// The three-way partition is what makes degenerate inputs safe: a run
/// whose keys all equal the pivot collapses in a single pass instead of
/// recursing forever.
fn quicksort(mut edges: &mut [Edge]) {
    while edges.len() > INSERTION_CUTOFF {
        let n = edges.len();
        let pivot = median_of_three(
            edges[0].reliability,
            edges[n / 2].reliability,
            edges[n - 1].reliability,
        );
        let (lt, gt) = partition_three_way(edges, pivot);
        if lt == 0 && gt == n {
            // Uniform run: every key equals the pivot, nothing to order.
            return;
        }

        // Recurse into the smaller side, keep iterating on the larger to
        // bound stack depth.
        let run = std::mem::take(&mut edges);
        if lt <= n - gt {
            let (left, rest) = run.split_at_mut(lt);
            quicksort(left);
            edges = &mut rest[gt - lt..];
        } else {
            let (head, right) = run.split_at_mut(gt);
            quicksort(right);
            edges = &mut head[..lt];
        }
    }
    insertion_sort(edges);
}

/// Partition into `[< pivot | == pivot | > pivot]`, returning the two
/// boundary indices.
fn partition_three_way(edges: &mut [Edge], pivot: f64) -> (usize, usize) {
    let mut lt = 0;
    let mut i = 0;
    let mut gt = edges.len();
    while i < gt {
        let key = edges[i].reliability;
        if key < pivot {
            edges.swap(lt, i);
            lt += 1;
            i += 1;
        } else if key > pivot {
            gt -= 1;
            edges.swap(i, gt);
        } else {
            i += 1;
        }
    }
    (lt, gt)
}

fn median_of_three(a: f64, b: f64, c: f64) -> f64 {
    if (a <= b) == (b <= c) {
        b
    } else if (b <= a) == (a <= c) {
        a
    } else {
        c
    }
}

fn insertion_sort(edges: &mut [Edge]) {
    for i in 1..edges.len() {
        let mut j = i;
        while j > 0 && edges[j - 1].reliability > edges[j].reliability {
            edges.swap(j - 1, j);
            j -= 1;
        }
    }
}
