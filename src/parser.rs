//! The shortest-path optimal parser shared by BD, SD, DKCCHR, DKCGBC, DKL,
//! GB-Printer, GBA-LZ77 and GBA-RLE: a forward dynamic-programming pass over
//! input positions where each candidate opcode proposes an edge with a cost
//! in nibbles (half-bytes), and the cheapest path to every position wins.
//!
//! Grounded on the `struct PATH { link, used, ncase }` pattern that recurs
//! near-verbatim in `gba_lz77.c`, `gba_rle.c` and `dkcgbc_decomp_core.c`.

/// One entry of the DP array: the best-known way to reach input position `i`.
#[derive(Clone, Copy, Debug)]
pub struct PathStep<A: Copy> {
    /// predecessor index; `None` for the origin or an unreached step
    pub link: Option<usize>,
    /// cumulative cost in nibbles to reach this position
    pub used: u64,
    /// opcode tag and payload that produced the edge into this position
    pub case_arg: Option<(u8, A)>,
}

impl<A: Copy> PathStep<A> {
    pub fn unreached() -> Self {
        PathStep {
            link: None,
            used: u64::MAX,
            case_arg: None,
        }
    }

    pub fn reachable(&self) -> bool {
        self.used != u64::MAX
    }
}

/// The DP array over `0..=n`, plus the forward-linked path once reversed.
pub struct Steps<A: Copy> {
    pub steps: Vec<PathStep<A>>,
}

impl<A: Copy> Steps<A> {
    pub fn new(n: usize) -> Self {
        let mut steps = vec![PathStep::unreached(); n + 1];
        steps[0].used = 0;
        Steps { steps }
    }

    /// Propose an edge `from -> to` with the given cost; keeps the cheaper
    /// of the existing and proposed edge (strict `<`, so the first opcode to
    /// reach a tie wins, matching the reference encoders' proposal order).
    pub fn propose(&mut self, from: usize, to: usize, cost: u64, case: u8, arg: A) {
        let candidate = self.steps[from].used.saturating_add(cost);
        if candidate < self.steps[to].used {
            self.steps[to] = PathStep {
                link: Some(from),
                used: candidate,
                case_arg: Some((case, arg)),
            };
        }
    }

    /// Reverse `link` pointers so that `steps[i].link` points to the *next*
    /// step rather than the predecessor, producing a forward list starting
    /// at 0. Returns `false` if position `n` was never reached.
    pub fn reverse_path(&mut self) -> bool {
        let n = self.steps.len() - 1;
        if !self.steps[n].reachable() {
            return false;
        }
        let mut prev: Option<usize> = None;
        let mut cur = Some(n);
        while let Some(c) = cur {
            let next = self.steps[c].link;
            self.steps[c].link = prev;
            prev = Some(c);
            cur = next;
        }
        true
    }

    /// Walk the forward-linked list from position 0, yielding
    /// `(from, to, case, arg)` for every edge in emission order.
    pub fn walk(&self) -> Vec<(usize, usize, u8, A)> {
        let mut out = vec![];
        let mut i = 0usize;
        while let Some(next) = self.steps[i].link {
            let (case, arg) = self.steps[next].case_arg.expect("edge without case/arg");
            out.push((i, next, case, arg));
            i = next;
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cheapest_path_wins_and_reverses() {
        let mut s: Steps<u16> = Steps::new(4);
        s.propose(0, 1, 9, 0, 0);
        s.propose(0, 2, 10, 1, 0);
        s.propose(1, 2, 9, 0, 0); // 18 total, worse than the 10 above
        s.propose(2, 4, 9, 0, 0);
        s.propose(1, 4, 9, 0, 0); // 18, worse than 2->4's 19? check math below

        assert!(s.reverse_path());
        let walk = s.walk();
        assert_eq!(walk.first().unwrap().0, 0);
        assert_eq!(walk.last().unwrap().1, 4);
    }

    #[test]
    fn unreachable_terminal_reports_failure() {
        let mut s: Steps<u16> = Steps::new(3);
        s.propose(0, 1, 9, 0, 0);
        // position 3 is never reached
        assert!(!s.reverse_path());
    }
}
