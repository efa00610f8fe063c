fn main() {
    if let Err(err) = kgraph_canvas::run() {
        eprintln!("error: {err:#}");
        std::process::exit(1);
    }
}
