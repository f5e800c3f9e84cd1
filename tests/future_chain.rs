//! `p1() -> 1`, `p2(f) -> 2 * f.get()`; chaining `async(p1).then(p2).then(p2)`
//! yields 4.

use taskfiber::future::{r#async, LaunchPolicy};

#[test]
fn chained_continuations_double_the_value_twice() {
    let future = r#async(|| 1u32, LaunchPolicy::OwnThread)
        .then(|f| 2 * f.get().unwrap())
        .then(|f| 2 * f.get().unwrap());

    assert_eq!(future.get().unwrap(), 4);
}
