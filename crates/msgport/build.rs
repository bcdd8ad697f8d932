//! Records the compilation target and cargo profile for `version --extended`
//! and `envinfo`.

const RECORDED: [(&str, &str); 2] = [
    ("TARGET", "MSGPORT_BUILD_TARGET"),
    ("PROFILE", "MSGPORT_BUILD_PROFILE"),
];

fn main() {
    for (cargo_var, exported) in RECORDED {
        println!("cargo:rerun-if-env-changed={cargo_var}");
        if let Ok(value) = std::env::var(cargo_var) {
            println!("cargo:rustc-env={exported}={value}");
        }
    }
}
