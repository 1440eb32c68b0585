use ab_argon2_block_codegen::generate_kernels;
use std::error::Error;

fn main() -> Result<(), Box<dyn Error>> {
    generate_kernels()?;

    Ok(())
}
