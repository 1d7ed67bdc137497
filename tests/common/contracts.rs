//! Contracts written in WAT for end-to-end runs on the wasmer backend.

/// A contract that reflects its execute message back as its response.
///
/// - `instantiate` and `migrate` store their message under `config`.
/// - `execute` returns its message, which must be a contract response, unchanged.
/// - `query` takes a raw key and answers with the value stored under it, aborting with
///   `not found` if there is none.
pub const REFLECT: &str = r#"
(module
    (import "env" "msg" (func $msg (param i32) (result i32)))
    (import "env" "db_read" (func $db_read (param i32 i32 i32) (result i64)))
    (import "env" "db_write" (func $db_write (param i32 i32 i32 i32)))
    (import "env" "set_response" (func $set_response (param i32 i32)))
    (import "env" "abort" (func $abort (param i32 i32)))

    (memory (export "memory") 2)
    (global $heap (mut i32) (i32.const 1024))
    (data (i32.const 16) "config")
    (data (i32.const 32) "not found")

    (func (export "alloc") (param $size i32) (result i32)
        (local $ptr i32)
        (local.set $ptr (global.get $heap))
        (global.set $heap (i32.add (global.get $heap) (local.get $size)))
        (local.get $ptr))

    (func $store_config
        (local $len i32)
        (local.set $len (call $msg (i32.const 0)))
        (call $db_write (i32.const 16) (i32.const 6) (i32.load (i32.const 0)) (local.get $len)))

    (func (export "instantiate")
        (call $store_config))

    (func (export "migrate")
        (call $store_config))

    (func (export "execute")
        (local $len i32)
        (local.set $len (call $msg (i32.const 0)))
        (call $set_response (i32.load (i32.const 0)) (local.get $len)))

    (func (export "query")
        (local $len i32)
        (local $found i64)
        (local.set $len (call $msg (i32.const 0)))
        (local.set $found
            (call $db_read (i32.load (i32.const 0)) (local.get $len) (i32.const 4)))
        (if (i64.lt_s (local.get $found) (i64.const 0))
            (then (call $abort (i32.const 32) (i32.const 9))))
        (call $set_response (i32.load (i32.const 4)) (i32.wrap_i64 (local.get $found))))
)
"#;

/// with_execute builds a minimal contract whose `execute` runs `body`. `abort` is imported and the
/// bytes `boom` sit at offset 16.
pub fn with_execute(body: &str) -> String {
    format!(
        r#"
(module
    (import "env" "abort" (func $abort (param i32 i32)))
    (memory (export "memory") 1)
    (data (i32.const 16) "boom")
    (func (export "alloc") (param i32) (result i32) (i32.const 1024))
    (func (export "instantiate"))
    (func (export "query"))
    (func (export "execute") {})
)
"#,
        body
    )
}

/// Spins until the budget runs out.
pub fn infinite_loop() -> String {
    with_execute("(loop $spin (br $spin))")
}

/// Aborts with `boom`.
pub fn aborting() -> String {
    with_execute("(call $abort (i32.const 16) (i32.const 4))")
}

/// Uses floating point, which is not deterministic and therefore rejected at upload.
pub fn floating_point() -> String {
    with_execute("(drop (f32.add (f32.const 1.5) (f32.const 2.5)))")
}

pub fn compile(wat: &str) -> Vec<u8> {
    wat::parse_str(wat).unwrap()
}
