//! Entry points of `java/lang/invoke/MethodHandleNatives`. Each one enters the VM, runs the
//! operation and turns an error into the thread's pending exception.

use std::sync::atomic::{fence, Ordering};

use tracing::{trace, trace_span};

use crate::vm::class::method::{NativeArgs, NativeFnPtr};
use crate::vm::error::{Exception, ExceptionKind, VmResult};
use crate::vm::invoke::bootstrap_args::copy_out_bootstrap_arguments;
use crate::vm::invoke::member_name;
use crate::vm::invoke::members::get_members;
use crate::vm::object::{Handle, HeapObject, JValue};
use crate::vm::thread::thread::VMThread;
use crate::vm::vm::Vm;

pub const METHOD_HANDLE_NATIVES: &str = "java/lang/invoke/MethodHandleNatives";

/// Native methods of `METHOD_HANDLE_NATIVES`: name, descriptor, implementation
pub const NATIVES: &[(&str, &str, NativeFnPtr)] = &[
    ("init", "(Ljava/lang/invoke/MemberName;Ljava/lang/Object;)V", init),
    ("expand", "(Ljava/lang/invoke/MemberName;)V", expand),
    ("resolve", "(Ljava/lang/invoke/MemberName;Ljava/lang/Class;Z)Ljava/lang/invoke/MemberName;", resolve),
    ("getMembers", "(Ljava/lang/Class;Ljava/lang/String;Ljava/lang/String;ILjava/lang/Class;I[Ljava/lang/invoke/MemberName;)I",
     getMembers),
    ("objectFieldOffset", "(Ljava/lang/invoke/MemberName;)J", objectFieldOffset),
    ("staticFieldOffset", "(Ljava/lang/invoke/MemberName;)J", staticFieldOffset),
    ("staticFieldBase", "(Ljava/lang/invoke/MemberName;)Ljava/lang/Object;", staticFieldBase),
    ("getMemberVMInfo", "(Ljava/lang/invoke/MemberName;)Ljava/lang/Object;", getMemberVMInfo),
    ("setCallSiteTargetNormal", "(Ljava/lang/invoke/CallSite;Ljava/lang/invoke/MethodHandle;)V",
     setCallSiteTargetNormal),
    ("setCallSiteTargetVolatile", "(Ljava/lang/invoke/CallSite;Ljava/lang/invoke/MethodHandle;)V",
     setCallSiteTargetVolatile),
    ("copyOutBootstrapArguments", "(Ljava/lang/Class;[III[Ljava/lang/Object;IZLjava/lang/Object;)V",
     copyOutBootstrapArguments),
    ("clearCallSiteContext", "(Ljava/lang/invoke/MethodHandleNatives$CallSiteContext;)V", clearCallSiteContext),
    ("getNamedCon", "(I[Ljava/lang/Object;)I", getNamedCon),
    ("registerNatives", "()V", registerNatives),
];

fn ref_arg(args: &NativeArgs, index: usize) -> Option<Handle> {
    args.get(index).and_then(JValue::as_ref)
}

fn int_arg(args: &NativeArgs, index: usize) -> i32 {
    args.get(index).map_or(0, JValue::as_int)
}

fn bool_arg(args: &NativeArgs, index: usize) -> bool {
    args.get(index).map_or(false, JValue::as_bool)
}

fn non_null(value: Option<Handle>, what: &str) -> VmResult<Handle> {
    value.ok_or_else(|| Exception::with_message(ExceptionKind::NullPointer, format!("{} is null", what)))
}

#[allow(non_snake_case)]
pub fn init(vm: &Vm, thread: &mut VMThread, args: NativeArgs) -> Option<JValue> {
    let _span = trace_span!("MethodHandleNatives.init").entered();
    let _access = vm.enter();

    let result = (|| {
        let mn = non_null(ref_arg(&args, 0), "mname")?;
        let target = non_null(ref_arg(&args, 1), "target")?;
        member_name::init(vm, mn, target)
    })();
    thread.check(result);
    None
}

#[allow(non_snake_case)]
pub fn expand(vm: &Vm, thread: &mut VMThread, args: NativeArgs) -> Option<JValue> {
    let _span = trace_span!("MethodHandleNatives.expand").entered();
    let _access = vm.enter();

    let result = non_null(ref_arg(&args, 0), "mname")
        .and_then(|mn| member_name::expand(vm, mn));
    thread.check(result);
    None
}

#[allow(non_snake_case)]
pub fn resolve(vm: &Vm, thread: &mut VMThread, args: NativeArgs) -> Option<JValue> {
    let _span = trace_span!("MethodHandleNatives.resolve").entered();
    let _access = vm.enter();

    let caller = ref_arg(&args, 1);
    let speculative = bool_arg(&args, 2);
    trace!(member = %vm.describe(ref_arg(&args, 0)), caller = %vm.describe(caller), speculative);

    let result = ref_arg(&args, 0)
        .ok_or_else(|| Exception::internal("mname is null"))
        .and_then(|mn| member_name::resolve(vm, mn, caller, speculative));
    thread.check(result).map(JValue::Ref)
}

#[allow(non_snake_case)]
pub fn getMembers(vm: &Vm, thread: &mut VMThread, args: NativeArgs) -> Option<JValue> {
    let _span = trace_span!("MethodHandleNatives.getMembers").entered();
    let _access = vm.enter();

    let result = get_members(vm, ref_arg(&args, 0), ref_arg(&args, 1), ref_arg(&args, 2), int_arg(&args, 3),
                             ref_arg(&args, 4), int_arg(&args, 5), ref_arg(&args, 6));
    thread.check(result).map(JValue::Int)
}

#[allow(non_snake_case)]
pub fn objectFieldOffset(vm: &Vm, thread: &mut VMThread, args: NativeArgs) -> Option<JValue> {
    let _span = trace_span!("MethodHandleNatives.objectFieldOffset").entered();
    let _access = vm.enter();

    let result = non_null(ref_arg(&args, 0), "mname")
        .and_then(|mn| member_name::object_field_offset(vm, mn));
    thread.check(result).map(JValue::Long)
}

#[allow(non_snake_case)]
pub fn staticFieldOffset(vm: &Vm, thread: &mut VMThread, args: NativeArgs) -> Option<JValue> {
    let _span = trace_span!("MethodHandleNatives.staticFieldOffset").entered();
    let _access = vm.enter();

    let result = non_null(ref_arg(&args, 0), "mname")
        .and_then(|mn| member_name::static_field_offset(vm, mn));
    thread.check(result).map(JValue::Long)
}

#[allow(non_snake_case)]
pub fn staticFieldBase(vm: &Vm, thread: &mut VMThread, args: NativeArgs) -> Option<JValue> {
    let _span = trace_span!("MethodHandleNatives.staticFieldBase").entered();
    let _access = vm.enter();

    let result = non_null(ref_arg(&args, 0), "mname")
        .and_then(|mn| member_name::static_field_base(vm, mn));
    thread.check(result).map(|base| JValue::Ref(Some(base)))
}

/// A null MemberName yields null without raising an exception
#[allow(non_snake_case)]
pub fn getMemberVMInfo(vm: &Vm, thread: &mut VMThread, args: NativeArgs) -> Option<JValue> {
    let _span = trace_span!("MethodHandleNatives.getMemberVMInfo").entered();
    let _access = vm.enter();

    let mn = match ref_arg(&args, 0) {
        Some(mn) => mn,
        None => return Some(JValue::Ref(None))
    };
    thread.check(member_name::get_member_vm_info(vm, mn)).map(|info| JValue::Ref(Some(info)))
}

fn set_call_site_target(vm: &Vm, args: &NativeArgs) -> VmResult<()> {
    let call_site = non_null(ref_arg(args, 0), "call site")?;
    let target = non_null(ref_arg(args, 1), "target")?;

    let stored = vm.heap.write(call_site, |o| match o {
        HeapObject::CallSite(cs) => {
            cs.target = Some(target);
            true
        }
        _ => false
    });
    if !stored {
        return Err(Exception::with_message(ExceptionKind::IllegalArgument, "not a CallSite"));
    }

    trace!(call_site = ?call_site, target = %vm.describe(Some(target)), "call site target set");
    Ok(())
}

#[allow(non_snake_case)]
pub fn setCallSiteTargetNormal(vm: &Vm, thread: &mut VMThread, args: NativeArgs) -> Option<JValue> {
    let _span = trace_span!("MethodHandleNatives.setCallSiteTargetNormal").entered();
    let _access = vm.enter();

    thread.check(set_call_site_target(vm, &args));
    None
}

#[allow(non_snake_case)]
pub fn setCallSiteTargetVolatile(vm: &Vm, thread: &mut VMThread, args: NativeArgs) -> Option<JValue> {
    let _span = trace_span!("MethodHandleNatives.setCallSiteTargetVolatile").entered();
    let _access = vm.enter();

    let result = set_call_site_target(vm, &args);
    fence(Ordering::SeqCst);
    thread.check(result);
    None
}

/// `indexInfo` is `[argCount, cpIndex]`
fn index_info(vm: &Vm, index_info: Option<Handle>) -> VmResult<(i32, i32)> {
    let index_info = non_null(index_info, "indexInfo")?;
    let info = vm.heap.read(index_info, |o| match o {
        HeapObject::IntArray(values) if values.len() >= 2 => Some((values[0], values[1])),
        _ => None
    });
    info.ok_or_else(|| Exception::internal("bad index info"))
}

#[allow(non_snake_case)]
pub fn copyOutBootstrapArguments(vm: &Vm, thread: &mut VMThread, args: NativeArgs) -> Option<JValue> {
    let _span = trace_span!("MethodHandleNatives.copyOutBootstrapArguments").entered();
    let _access = vm.enter();

    let result = (|| {
        let caller = non_null(ref_arg(&args, 0), "caller")?;
        let caller = vm.class_of_mirror(caller)
            .ok_or_else(|| Exception::internal("caller is not a class"))?;
        let (arg_count, cp_index) = index_info(vm, ref_arg(&args, 1))?;
        let buf = non_null(ref_arg(&args, 4), "buf")?;

        copy_out_bootstrap_arguments(vm, &caller, arg_count, cp_index, int_arg(&args, 2), int_arg(&args, 3),
                                     buf, int_arg(&args, 5), bool_arg(&args, 6), ref_arg(&args, 7))
    })();
    thread.check(result);
    None
}

#[allow(non_snake_case)]
pub fn clearCallSiteContext(_: &Vm, _: &mut VMThread, _: NativeArgs) -> Option<JValue> {
    None
}

#[allow(non_snake_case)]
pub fn getNamedCon(_: &Vm, _: &mut VMThread, _: NativeArgs) -> Option<JValue> {
    Some(JValue::Int(0))
}

#[allow(non_snake_case)]
pub fn registerNatives(_: &Vm, _: &mut VMThread, _: NativeArgs) -> Option<JValue> {
    None
}
