use cmmc::{compile, frontend::SourceFile, middle::tac::interp::Machine};
use indoc::indoc;

fn run(source: &str, input: &[&str]) -> Vec<String> {
    let source = SourceFile::new_in_memory(source);
    let program = compile(&source).expect("program should compile");

    Machine::new(&program, input.iter().map(|s| s.to_string()))
        .run()
        .expect("program should run")
}

#[test]
fn a_while_loop_counts_up() {
    let output = run(
        indoc! {"
            int x;
            x = 0;
            while (x < 10) {
                x++;
            }
            output x;
        "},
        &[],
    );

    assert_eq!(output, vec!["10"]);
}

#[test]
fn a_false_while_condition_skips_the_body() {
    let output = run(
        indoc! {"
            int x;
            x = 5;
            while (x < 0) {
                x++;
            }
            output x;
        "},
        &[],
    );

    assert_eq!(output, vec!["5"]);
}

#[test]
fn recursion_threads_arguments_and_returns() {
    let output = run(
        indoc! {"
            int fact(int n) {
                if (n < 2) {
                    return 1;
                }
                return n * fact(n - 1);
            }
            void main() {
                output fact(5);
            }
        "},
        &[],
    );

    assert_eq!(output, vec!["120"]);
}

#[test]
fn global_statements_run_before_main() {
    let output = run(
        indoc! {"
            int x;
            void main() {
                output x;
            }
            x = 3 + 4 * 2;
        "},
        &[],
    );

    assert_eq!(output, vec!["11"]);
}

#[test]
fn pointers_write_through_to_their_target() {
    let output = run(
        indoc! {"
            int x;
            int ptr p;
            p = &x;
            @p = 41;
            x++;
            output x;
            output @p;
        "},
        &[],
    );

    assert_eq!(output, vec!["42", "42"]);
}

#[test]
fn input_feeds_variables_in_order() {
    let output = run(
        indoc! {"
            int a;
            int b;
            input a;
            input b;
            output a + b;
        "},
        &["40", "2"],
    );

    assert_eq!(output, vec!["42"]);
}

#[test]
fn shorts_wrap_like_a_signed_byte() {
    let output = run(
        indoc! {"
            short s;
            s = 127s;
            s++;
            output s;
        "},
        &[],
    );

    assert_eq!(output, vec!["-128"]);
}

#[test]
fn booleans_and_strings_report_as_text() {
    let output = run(
        indoc! {r#"
            bool b;
            b = 1 < 2 && !false;
            output b;
            output "done";
        "#},
        &[],
    );

    assert_eq!(output, vec!["true", "done"]);
}

#[test]
fn branches_pick_the_right_arm() {
    let output = run(
        indoc! {"
            int classify(int n) {
                if (n < 0) {
                    return 0 - 1;
                } else {
                    if (n == 0) {
                        return 0;
                    }
                }
                return 1;
            }
            void main() {
                output classify(0 - 5);
                output classify(0);
                output classify(9);
            }
        "},
        &[],
    );

    assert_eq!(output, vec!["-1", "0", "1"]);
}

#[test]
fn mixed_width_arithmetic_widens_shorts() {
    let output = run(
        indoc! {"
            int x;
            short s;
            s = 100s;
            x = s + 1000;
            output x;
        "},
        &[],
    );

    assert_eq!(output, vec!["1100"]);
}

#[test]
fn void_functions_return_early() {
    let output = run(
        indoc! {"
            int x;
            void poke(int n) {
                if (n < 0) {
                    return;
                }
                x = n;
            }
            void main() {
                poke(7);
                poke(0 - 3);
                output x;
            }
        "},
        &[],
    );

    assert_eq!(output, vec!["7"]);
}

#[test]
fn a_function_named_global_is_the_users_own() {
    // The synthetic top-level procedure must not capture calls to a user
    // function that happens to be named `global`
    let output = run(
        indoc! {"
            int x;
            x = 5;
            void global() {
                x = 99;
            }
            void main() {
                global();
                output x;
            }
        "},
        &[],
    );

    assert_eq!(output, vec!["99"]);
}

#[test]
fn out_of_range_short_literals_wrap_consistently() {
    let output = run(
        indoc! {"
            short s;
            s = 200s;
            output s;
            output 200s;
        "},
        &[],
    );

    assert_eq!(output, vec!["-56", "-56"]);
}

#[test]
fn updates_increment_through_a_pointer() {
    let output = run(
        indoc! {"
            int x;
            int ptr p;
            p = &x;
            x = 41;
            @p++;
            output x;
            @p--;
            @p--;
            output x;
        "},
        &[],
    );

    assert_eq!(output, vec!["42", "40"]);
}
