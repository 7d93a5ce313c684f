use std::num::NonZeroUsize;
use std::path::PathBuf;
use std::process;

use clap::{Parser, Subcommand};

use jvm_invoke::vm::class::constant_pool::CPEntry;
use jvm_invoke::vm::error::{Exception, VmResult};
use jvm_invoke::vm::invoke::bootstrap_args::{copy_out_bootstrap_arguments, BSM_INDEX};
use jvm_invoke::vm::invoke::flags::{MatchFlags, MemberFlags, MemberKind, RefKind};
use jvm_invoke::vm::invoke::member_name::{read_member_name, resolve};
use jvm_invoke::vm::invoke::members::get_members;
use jvm_invoke::vm::object::{Handle, HeapObject, MemberName};
use jvm_invoke::vm::pool::object::HeapConfig;
use jvm_invoke::vm::vm::{Vm, VmConfig};

#[derive(Parser)]
#[clap(author, version, about = "Method handle linkage over a class path")]
struct Cli {
    /// Directory searched for class files
    #[clap(short = 'c', long = "classpath", value_name = "DIR")]
    classpath: Vec<PathBuf>,

    /// Maximum number of live heap objects
    #[clap(long)]
    heap_capacity: Option<usize>,

    /// Relocate the heap every N allocations
    #[clap(long, value_name = "N")]
    gc_stress: Option<usize>,

    #[clap(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Lists the members of a class
    Members {
        class: String,
        #[clap(long)]
        name: Option<String>,
        #[clap(long)]
        sig: Option<String>,
        /// Fields instead of methods and constructors
        #[clap(long)]
        fields: bool,
        #[clap(long)]
        supers: bool,
        #[clap(long)]
        interfaces: bool,
        #[clap(long, default_value_t = 0)]
        skip: i32,
        #[clap(long, default_value_t = 32)]
        max: usize,
    },
    /// Resolves a symbolic member reference
    Resolve {
        class: String,
        name: String,
        descriptor: String,
        /// Reference kind, e.g. invokeStatic or getField
        #[clap(long, default_value = "invokeVirtual")]
        kind: RefKind,
        #[clap(long)]
        speculative: bool,
    },
    /// Materializes the bootstrap arguments of a dynamic constant
    BootstrapArgs {
        class: String,
        cp_index: u16,
        /// Leave unresolved arguments null
        #[clap(long)]
        no_resolve: bool,
    },
}

fn member_name_array(vm: &Vm, len: usize) -> VmResult<Handle> {
    let component = vm.core_class("java/lang/invoke/MemberName")?;
    let array = vm.new_object_array(component.id, len)?;
    for i in 0..len {
        let mn = vm.heap.allocate(HeapObject::MemberName(MemberName::default()))?;
        vm.heap.write(array, |o| {
            if let Some(a) = o.as_object_array_mut() {
                a.elements[i] = Some(mn);
            }
        });
    }
    Ok(array)
}

fn elements(vm: &Vm, array: Handle) -> Vec<Option<Handle>> {
    vm.heap.read(array, |o| o.as_object_array().map(|a| a.elements.clone()))
        .unwrap_or_default()
}

fn run(vm: &Vm, command: Command) -> VmResult<()> {
    let _access = vm.enter();

    match command {
        Command::Members { class, name, sig, fields, supers, interfaces, skip, max } => {
            let class = vm.load_class(&class)?;
            let mut flags = if fields {
                MatchFlags::IS_FIELD
            } else {
                MatchFlags::IS_METHOD | MatchFlags::IS_CONSTRUCTOR
            };
            flags.set(MatchFlags::SEARCH_SUPERCLASSES, supers);
            flags.set(MatchFlags::SEARCH_INTERFACES, interfaces);

            let name = name.map(|n| vm.intern(&n)).transpose()?;
            let sig = sig.map(|s| vm.intern(&s)).transpose()?;
            let results = member_name_array(vm, max)?;

            let count = get_members(vm, Some(class.mirror), name, sig, flags.bits(), None, skip,
                                    Some(results))?;
            println!("{} matches", count);

            let filled = (count - skip.max(0)).clamp(0, max as i32) as usize;
            for mn in elements(vm, results).into_iter().take(filled) {
                println!("  {}", vm.describe(mn));
            }
        }
        Command::Resolve { class, name, descriptor, kind, speculative } => {
            let class = vm.load_class(&class)?;
            let member_kind = if kind.is_field() {
                MemberKind::Field
            } else if kind == RefKind::NewInvokeSpecial {
                MemberKind::Constructor
            } else {
                MemberKind::Method
            };

            let name = vm.intern(&name)?;
            let type_ = vm.intern(&descriptor)?;
            let mn = vm.heap.allocate(HeapObject::MemberName(MemberName {
                flags: MemberFlags::new(member_kind, kind, 0).encode(),
                name: Some(name),
                type_: Some(type_),
                clazz: Some(class.mirror),
                ..Default::default()
            }))?;

            match resolve(vm, mn, None, speculative)? {
                Some(resolved) => {
                    let member = read_member_name(vm, resolved)?;
                    println!("{}", vm.describe(Some(resolved)));
                    println!("  vmindex={:#x} vmtarget={:#x}", member.vmindex, member.vmtarget);
                }
                None => println!("not resolved"),
            }
        }
        Command::BootstrapArgs { class, cp_index, no_resolve } => {
            let class = vm.load_class(&class)?;
            let bsm_index = match class.constant_pool.get(cp_index) {
                Some(CPEntry::Dynamic { bsm_index, .. }) => *bsm_index,
                _ => return Err(Exception::internal(
                    format!("{}: #{} is not a dynamic constant", class.name, cp_index)))
            };
            let arg_count = class.bootstrap_method(bsm_index).map_or(0, |(_, args)| args.len()) as i32;

            let object = vm.core_class("java/lang/Object")?;
            let buf = vm.new_object_array(object.id, (arg_count - BSM_INDEX) as usize)?;
            copy_out_bootstrap_arguments(vm, &class, arg_count, cp_index as i32, BSM_INDEX, arg_count,
                                         buf, 0, !no_resolve, None)?;

            let labels = ["bsm", "name", "type", "count"];
            for (i, value) in elements(vm, buf).into_iter().enumerate() {
                let label = labels.get(i).map_or_else(|| format!("arg{}", i - labels.len()), |l| l.to_string());
                println!("{:>6}: {}", label, vm.describe(value));
            }
        }
    }

    Ok(())
}

fn main() {
    let cli = Cli::parse();

    let mut heap = HeapConfig::default();
    if let Some(capacity) = cli.heap_capacity {
        heap.capacity = capacity;
    }
    heap.relocate_every = cli.gc_stress.and_then(NonZeroUsize::new);

    let config = VmConfig { heap, classpath: cli.classpath };
    let result = Vm::new(config).and_then(|vm| run(&vm, cli.command));

    if let Err(e) = result {
        eprintln!("{}", e);
        process::exit(1);
    }
}
