//! A miniature RAM interpreter, just enough to execute emitted images in
//! tests. Cell 0 is the accumulator; arithmetic wraps; dividing by zero
//! panics, which is exactly the observable the short-circuit tests rely
//! on.

use rame_codegen::{Address, Instr, Operand, RamProgram};

/// Executes `program` against `input`, returning everything it wrote.
pub fn run(program: &RamProgram, input: &[i32]) -> Vec<i32> {
    let lines = program.lines();
    let mut mem = vec![0i32; 4096];
    let mut input = input.iter().copied();
    let mut output = Vec::new();
    let mut pc = 0usize;
    let mut steps = 0u64;

    let value = |mem: &[i32], operand: Operand| -> i32 {
        match operand {
            Operand::Imm(k) => k,
            Operand::Dir(n) => mem[n as usize],
            Operand::Ind(n) => mem[mem[n as usize] as usize],
        }
    };

    loop {
        steps += 1;
        assert!(steps < 1_000_000, "runaway program");
        let line = lines.get(pc).expect("fell off the program image");

        match line.instr {
            Instr::Load(op) => mem[0] = value(&mem, op),
            Instr::Store(Address::Dir(n)) => mem[n as usize] = mem[0],
            Instr::Store(Address::Ind(n)) => {
                let adr = mem[n as usize] as usize;
                mem[adr] = mem[0];
            }
            Instr::Add(op) => mem[0] = mem[0].wrapping_add(value(&mem, op)),
            Instr::Sub(op) => mem[0] = mem[0].wrapping_sub(value(&mem, op)),
            Instr::Mul(op) => mem[0] = mem[0].wrapping_mul(value(&mem, op)),
            Instr::Div(op) => {
                let divisor = value(&mem, op);
                assert!(divisor != 0, "division by zero");
                mem[0] = mem[0].wrapping_div(divisor);
            }
            Instr::Mod(op) => {
                let divisor = value(&mem, op);
                assert!(divisor != 0, "division by zero");
                mem[0] = mem[0].wrapping_rem(divisor);
            }
            Instr::Inc(n) => mem[n as usize] = mem[n as usize].wrapping_add(1),
            Instr::Dec(n) => mem[n as usize] = mem[n as usize].wrapping_sub(1),
            Instr::Jump(target) => {
                pc = target as usize;
                continue;
            }
            Instr::Jumz(target) => {
                if mem[0] == 0 {
                    pc = target as usize;
                    continue;
                }
            }
            Instr::Juml(target) => {
                if mem[0] < 0 {
                    pc = target as usize;
                    continue;
                }
            }
            Instr::Jumg(target) => {
                if mem[0] > 0 {
                    pc = target as usize;
                    continue;
                }
            }
            Instr::Read => mem[0] = input.next().expect("input exhausted"),
            Instr::Write => output.push(mem[0]),
            Instr::Nop => {}
            Instr::Stop => return output,
        }

        pc += 1;
    }
}
