// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[test]
fn bash_defaults_to_path_lookup() {
    assert_eq!(Bash::default().full_path(), Path::new("bash"));
}

#[test]
fn bash_passes_script_then_arguments() {
    let bash = Bash::new("/bin/bash");
    let args = bash.format_arguments(Path::new("/w/Bootstrap.sh"), &["a b".to_string(), "-x".to_string()]);
    assert_eq!(args, ["/w/Bootstrap.sh", "a b", "-x"]);
}
