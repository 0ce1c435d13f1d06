// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[test]
fn root_path_has_no_steps() {
    let path: Path = "/".parse().unwrap();
    assert!(path.is_root());
    assert_eq!(path.to_string(), "/");
}

#[test]
fn simple_path_round_trips() {
    let path: Path = "/cfg/host/addr".parse().unwrap();
    assert_eq!(path.steps.len(), 3);
    assert_eq!(path.steps[1].tag, "host");
    assert_eq!(path.to_string(), "/cfg/host/addr");
}

#[test]
fn keyed_step_round_trips() {
    let path: Path = "/cfg/host[name=h1]/addr".parse().unwrap();
    assert_eq!(path.steps[1].key, Some(("name".to_string(), "h1".to_string())));
    assert_eq!(path.to_string(), "/cfg/host[name=h1]/addr");
}

#[yare::parameterized(
    no_slash = { "cfg/host" },
    empty_step = { "/cfg//host" },
    unclosed_predicate = { "/cfg/host[name=h1" },
    no_equals = { "/cfg/host[name]" },
    empty_tag = { "/[name=h1]" },
)]
fn malformed_paths_are_rejected(input: &str) {
    assert!(input.parse::<Path>().is_err(), "{input:?} should not parse");
}

#[test]
fn parent_and_join_are_inverses() {
    let path: Path = "/cfg/host[name=h1]".parse().unwrap();
    let parent = path.parent().unwrap();
    assert_eq!(parent.to_string(), "/cfg");
    assert_eq!(parent.join(Step::keyed("host", "name", "h1")), path);
    assert_eq!(Path::root().parent(), None);
}
