use pixir::generator::GeneratorRegistry;

pub fn cmd_list(registry: &GeneratorRegistry) {
    let names = registry.enumerate();
    if names.is_empty() {
        eprintln!("No generators have been registered");
        return;
    }
    for name in names {
        println!("{}", name);
    }
}
