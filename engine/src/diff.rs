//! Diff computes the RFC 6902 patch that turns one canonical payload into
//! another, using longest-common-subsequence matching on array elements so
//! that reordering or inserting one item does not rewrite the whole array.
use std::collections::BTreeSet;

use serde_json::Value;
use tailor_model::PatchOp;

/// Diff returns the ordered patch that turns `old` into `new`. The result
/// is safe to apply sequentially with `json_patch::patch`.
pub fn diff(old: &Value, new: &Value) -> Vec<PatchOp> {
    let mut out = Vec::new();
    diff_values(old, new, "", &mut out);
    out
}

/// Apply runs `patches` against `doc` using `json_patch`, the same crate
/// that applies template overlay patches elsewhere in this workspace. It
/// exists mainly so the changeset builder's output can be checked for
/// idempotency in tests: applying a generated patch to its source document
/// must reproduce the target document exactly.
pub fn apply(doc: &Value, patches: &[PatchOp]) -> crate::Result<Value> {
    let mut out = doc.clone();
    let raw = serde_json::to_value(patches)?;
    let patch: json_patch::Patch = serde_json::from_value(raw)?;
    json_patch::patch(&mut out, &patch)?;
    Ok(out)
}

fn diff_values(old: &Value, new: &Value, path: &str, out: &mut Vec<PatchOp>) {
    match (old, new) {
        (Value::Object(o), Value::Object(n)) => {
            for (k, nv) in n {
                let child = format!("{path}/{}", escape(k));
                match o.get(k) {
                    Some(ov) => diff_values(ov, nv, &child, out),
                    None => out.push(PatchOp::Add {
                        path: child,
                        value: nv.clone(),
                    }),
                }
            }
            for k in o.keys() {
                if !n.contains_key(k) {
                    out.push(PatchOp::Remove {
                        path: format!("{path}/{}", escape(k)),
                    });
                }
            }
        }
        (Value::Array(o), Value::Array(n)) => diff_arrays(o, n, path, out),
        _ => {
            if old != new {
                out.push(PatchOp::Replace {
                    path: path.to_string(),
                    value: new.clone(),
                });
            }
        }
    }
}

/// Diff_arrays aligns `old` and `new` on their longest common subsequence
/// of exactly-equal elements, then extends that alignment with
/// position-aligned pairs across the gaps between (and around) the LCS
/// matches, so an element that merely changed a nested field lines up
/// with its counterpart and is recursed into via [`diff_values`] (one
/// `replace`) instead of being rewritten as a whole-element `remove` plus
/// `add`. Only the leftover, unpaired elements become plain removals
/// (highest old index first, so earlier indices stay valid) or
/// insertions (lowest new index first, against the array as it stands
/// after the removals). Paired elements are emitted first since `replace`
/// never shifts array indices, so the subsequent removals can still rely
/// on `old`'s original indexing.
fn diff_arrays(old: &[Value], new: &[Value], path: &str, out: &mut Vec<PatchOp>) {
    let matches = lcs_matches(old, new);

    let mut pairs = Vec::new();
    let (mut oi, mut ni) = (0usize, 0usize);
    for (mo, mn) in matches.iter().copied().chain(std::iter::once((old.len(), new.len()))) {
        let aligned = (mo - oi).min(mn - ni);
        for k in 0..aligned {
            pairs.push((oi + k, ni + k));
        }
        if mo < old.len() {
            pairs.push((mo, mn));
        }
        oi = mo + 1;
        ni = mn + 1;
    }

    let paired_old: BTreeSet<usize> = pairs.iter().map(|(i, _)| *i).collect();
    let paired_new: BTreeSet<usize> = pairs.iter().map(|(_, j)| *j).collect();

    for &(i, j) in &pairs {
        diff_values(&old[i], &new[j], &format!("{path}/{i}"), out);
    }

    for i in (0..old.len()).rev() {
        if !paired_old.contains(&i) {
            out.push(PatchOp::Remove {
                path: format!("{path}/{i}"),
            });
        }
    }

    let mut cur_len = 0usize;
    for (j, item) in new.iter().enumerate() {
        if paired_new.contains(&j) {
            cur_len += 1;
        } else {
            out.push(PatchOp::Add {
                path: format!("{path}/{cur_len}"),
                value: item.clone(),
            });
            cur_len += 1;
        }
    }
}

/// Lcs_matches returns the index pairs `(old_idx, new_idx)` of a longest
/// common subsequence of elements that compare equal, in ascending order
/// of both indices.
fn lcs_matches(old: &[Value], new: &[Value]) -> Vec<(usize, usize)> {
    let n = old.len();
    let m = new.len();
    let mut dp = vec![vec![0usize; m + 1]; n + 1];
    for i in (0..n).rev() {
        for j in (0..m).rev() {
            dp[i][j] = if old[i] == new[j] {
                dp[i + 1][j + 1] + 1
            } else {
                dp[i + 1][j].max(dp[i][j + 1])
            };
        }
    }

    let mut out = Vec::new();
    let (mut i, mut j) = (0, 0);
    while i < n && j < m {
        if old[i] == new[j] {
            out.push((i, j));
            i += 1;
            j += 1;
        } else if dp[i + 1][j] >= dp[i][j + 1] {
            i += 1;
        } else {
            j += 1;
        }
    }
    out
}

/// Escape applies the RFC 6901 JSON Pointer escaping rules to one token.
fn escape(token: &str) -> String {
    token.replace('~', "~0").replace('/', "~1")
}
